use chrono::{NaiveDate, NaiveDateTime};
use daokit_core::bet::date_value;
use daokit_core::dao::mapper::{entity_params, ParamMap};
use daokit_core::{
    bet_mapper_registry, Bet, BetFinder, BetService, ContextDao, Criteria, Dao, DataAccessKind,
    DataSource, ManagedDao, MapperDao, OrmTemplate, SessionDao, StatementRegistry, TemplateDao,
    BET_MAPPING,
};
use rusqlite::types::Value;

fn match_day(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2013, 12, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

#[test]
fn session_query_language_binds_positional_parameters() {
    let source = DataSource::in_memory().unwrap();
    let dao = SessionDao::<Bet>::new(&source);
    dao.save(&Bet::new("lions", "tigers", "1:0", match_day(18)))
        .unwrap();
    dao.save(&Bet::new("lions", "bears", "0:2", match_day(19)))
        .unwrap();

    let found = dao
        .execute_result_list(
            "from Bet b where b.team1 = ? order by b.bet_date desc",
            vec![text("lions")],
        )
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].team2, "bears");

    let single = dao
        .execute_single_result("from Bet b where b.score = ?", vec![text("1:0")])
        .unwrap()
        .unwrap();
    assert_eq!(single.team2, "tigers");
}

#[test]
fn session_rejects_queries_outside_its_mapping() {
    let source = DataSource::in_memory().unwrap();
    let dao = SessionDao::<Bet>::new(&source);

    let err = dao
        .execute_result_list("from Bet b where b.stake = ?", vec![text("x")])
        .unwrap_err();
    assert_eq!(err.data_access_kind(), Some(&DataAccessKind::Mapping));
    assert!(err.to_string().contains("session result_list Bet"));
}

#[test]
fn session_execute_action_runs_in_one_transaction() {
    let source = DataSource::in_memory().unwrap();
    let dao = SessionDao::<Bet>::new(&source);

    let ids = dao
        .execute_action(|session| {
            let first = session.save(&Bet::new("a", "b", "", match_day(18)))?;
            let second = session.save(&Bet::new("c", "d", "", match_day(19)))?;
            Ok((first, second))
        })
        .unwrap();
    assert!(ids.0 < ids.1);
    assert_eq!(dao.get_all().unwrap().len(), 2);
}

#[test]
fn context_criteria_reject_unknown_columns() {
    let source = DataSource::in_memory().unwrap();
    let dao = ContextDao::<Bet>::new(&source);

    let err = dao
        .execute_result_list(&Criteria::new().eq("stake", 10_i64))
        .unwrap_err();
    assert_eq!(err.data_access_kind(), Some(&DataAccessKind::Mapping));
}

#[test]
fn context_criteria_order_results() {
    let source = DataSource::in_memory().unwrap();
    let dao = ContextDao::<Bet>::new(&source);
    dao.save(&Bet::new("a", "b", "", match_day(18))).unwrap();
    dao.save(&Bet::new("a", "b", "", match_day(20))).unwrap();
    dao.save(&Bet::new("a", "b", "", match_day(19))).unwrap();

    let ordered = dao
        .execute_result_list(
            &Criteria::new()
                .eq("team1", "a".to_string())
                .order_by("bet_date", false),
        )
        .unwrap();
    let days = ordered
        .iter()
        .map(|bet| bet.bet_date)
        .collect::<Vec<_>>();
    assert_eq!(days, vec![match_day(20), match_day(19), match_day(18)]);

    let single = dao
        .execute_single_result(&Criteria::new().eq("bet_date", date_value(match_day(19))))
        .unwrap();
    assert_eq!(single.map(|bet| bet.bet_date), Some(match_day(19)));
}

#[test]
fn mapper_reports_unknown_statements_and_missing_parameters() {
    let source = DataSource::in_memory().unwrap();
    let dao = MapperDao::<Bet>::new(&source, bet_mapper_registry().unwrap());

    let unknown = dao
        .execute_result_list("selectEverythingBet", &ParamMap::new())
        .unwrap_err();
    assert_eq!(unknown.data_access_kind(), Some(&DataAccessKind::Mapping));

    let params = ParamMap::from([("team1".to_string(), text("a"))]);
    let missing = dao.execute_result_list("selectListBet", &params).unwrap_err();
    assert!(missing.to_string().contains("missing statement parameter `team2`"));
}

#[test]
fn mapper_without_finder_statements_fails_finders_only() {
    let source = DataSource::in_memory().unwrap();
    let registry = StatementRegistry::for_table(&BET_MAPPING).unwrap();
    let dao = MapperDao::<Bet>::new(&source, registry);

    let saved = dao.save(&Bet::new("a", "b", "", match_day(18))).unwrap();
    assert!(dao.find_one(saved.id).unwrap().is_some());
    assert!(!dao.registry().contains("selectListBet"));
    let err = dao.find_bet_by_teams("a", "b").unwrap_err();
    assert_eq!(err.data_access_kind(), Some(&DataAccessKind::Mapping));
}

#[test]
fn mapper_and_template_insert_preset_identifiers() {
    let source = DataSource::in_memory().unwrap();
    let mapper = MapperDao::<Bet>::new(&source, bet_mapper_registry().unwrap());
    let template = TemplateDao::<Bet>::new(&source);

    let preset = Bet {
        id: Some(40),
        ..Bet::new("a", "b", "", match_day(18))
    };
    assert_eq!(mapper.save(&preset).unwrap().id, Some(40));

    let duplicate = template.save(&preset).unwrap_err();
    assert!(duplicate.is_backend());
    assert!(std::error::Error::source(&duplicate).is_some());

    let other = Bet {
        id: Some(41),
        ..preset.clone()
    };
    assert_eq!(template.save(&other).unwrap().id, Some(41));
    assert!(mapper.save(&other).unwrap_err().is_backend());
}

#[test]
fn entity_params_carry_identifier_and_columns() {
    let bet = Bet::new("a", "b", "1:1", match_day(18));
    let params = entity_params(&bet).unwrap();
    assert_eq!(params.get("id"), Some(&Value::Null));
    assert_eq!(params.get("team1"), Some(&text("a")));
    assert_eq!(params.get("bet_date"), Some(&date_value(match_day(18))));
}

#[test]
fn template_uses_custom_row_mapper() {
    let source = DataSource::in_memory().unwrap();
    TemplateDao::<Bet>::new(&source)
        .save(&Bet::new("a", "b", "2:0", match_day(18)))
        .unwrap();

    fn shouting(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bet> {
        let mut bet = <Bet as daokit_core::RowMapped>::from_row(row)?;
        bet.team1 = bet.team1.to_uppercase();
        Ok(bet)
    }
    let dao = TemplateDao::<Bet>::with_row_mapper(&source, shouting);

    let all = dao.get_all().unwrap();
    assert_eq!(all[0].team1, "A");
    let listed = dao
        .execute_result_list("SELECT * FROM bet WHERE score = ?1", &[text("2:0")])
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn orm_template_runs_each_call_as_committed_unit() {
    let source = DataSource::in_memory().unwrap();
    let template = OrmTemplate::new(&source);
    let dao = ManagedDao::<Bet>::new(template);

    let id = dao
        .template()
        .save(&Bet::new("a", "b", "", match_day(18)))
        .unwrap();
    let seen_elsewhere = SessionDao::<Bet>::new(&source).find_one(Some(id)).unwrap();
    assert!(seen_elsewhere.is_some());

    let found = template
        .find::<Bet>("from Bet where team1 = ?", vec![text("a")])
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn bet_service_validates_and_delegates() {
    let source = DataSource::in_memory().unwrap();
    let service = BetService::new(ContextDao::<Bet>::new(&source));

    let bet = service
        .place_bet(" lions ", "tigers", " 1:0 ", match_day(18))
        .unwrap();
    assert_eq!(bet.team1, "lions");
    assert_eq!(bet.score, "1:0");

    assert!(service
        .place_bet("   ", "tigers", "", match_day(18))
        .unwrap_err()
        .is_invalid_argument());

    let scored = service.record_score(bet.id.unwrap(), "2:2").unwrap();
    assert_eq!(scored.score, "2:2");
    assert!(service.record_score(999, "0:0").unwrap_err().is_not_found());

    assert_eq!(
        service.bet_for_match("lions", "tigers", match_day(18)).unwrap(),
        Some(scored.clone())
    );
    service.cancel_bet(&scored).unwrap();
    assert!(service.all_bets().unwrap().is_empty());
    assert!(service.bets_between_teams("lions", "tigers").unwrap().is_empty());
}
