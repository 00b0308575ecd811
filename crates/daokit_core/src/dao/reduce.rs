//! Reduction of query results to single or list form.

use super::error::{DaoError, DaoResult};

/// Reduces rows to at most one entity.
///
/// 0 rows -> `None`, 1 row -> `Some`, more -> `NonUniqueResult`.
pub fn reduce_single<T>(entity: &'static str, mut rows: Vec<T>) -> DaoResult<Option<T>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(DaoError::non_unique(entity, count)),
    }
}

#[cfg(test)]
mod tests {
    use super::reduce_single;
    use crate::dao::error::DataAccessKind;

    #[test]
    fn empty_rows_reduce_to_none() {
        assert_eq!(reduce_single::<u8>("Bet", Vec::new()).unwrap(), None);
    }

    #[test]
    fn single_row_is_returned() {
        assert_eq!(reduce_single("Bet", vec![3]).unwrap(), Some(3));
    }

    #[test]
    fn several_rows_are_non_unique() {
        let err = reduce_single("Bet", vec![1, 2]).unwrap_err();
        assert_eq!(
            err.data_access_kind(),
            Some(&DataAccessKind::NonUniqueResult {
                entity: "Bet",
                count: 2
            })
        );
    }
}
