use chrono::{NaiveDate, NaiveDateTime};
use daokit_core::{
    bet_mapper_registry, Bet, BetFinder, ContextDao, Dao, DataAccessKind, DataSource,
    ManagedDao, MapperDao, OrmTemplate, SessionDao, TemplateDao,
};

fn match_day(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn unsaved_bet() -> Bet {
    Bet::new("team1", "team2", "2:1", match_day(2013, 12, 18))
}

fn assert_crud_lifecycle<D: Dao<Bet>>(dao: &D) {
    assert!(dao.get_all().unwrap().is_empty());

    let saved = dao.save(&unsaved_bet()).unwrap();
    let id = saved.id.unwrap();
    assert_eq!(dao.get_identifier(&saved), Some(id));
    assert_eq!(saved.team1, "team1");
    assert_eq!(saved.bet_date, match_day(2013, 12, 18));

    let loaded = dao.find_one(Some(id)).unwrap().unwrap();
    assert_eq!(loaded, saved);

    let mut changed = loaded.clone();
    changed.score = "3:3".to_string();
    let updated = dao.update(&changed).unwrap();
    assert_eq!(updated.score, "3:3");
    assert_eq!(dao.find_one(Some(id)).unwrap().unwrap().score, "3:3");

    let all = dao.get_all().unwrap();
    assert_eq!(all, vec![updated.clone()]);

    dao.delete(&updated).unwrap();
    assert_eq!(dao.find_one(Some(id)).unwrap(), None);
    assert!(dao.get_all().unwrap().is_empty());
}

fn assert_rejects_missing_identifiers<D: Dao<Bet>>(dao: &D) {
    let unsaved = unsaved_bet();
    assert_eq!(dao.get_identifier(&unsaved), None);

    assert!(dao.find_one(None).unwrap_err().is_invalid_argument());
    assert!(dao.update(&unsaved).unwrap_err().is_invalid_argument());
    assert!(dao.delete(&unsaved).unwrap_err().is_invalid_argument());
}

fn assert_unknown_identifier_handling<D: Dao<Bet>>(dao: &D) {
    assert_eq!(dao.find_one(Some(999)).unwrap(), None);

    let ghost = Bet {
        id: Some(999),
        ..unsaved_bet()
    };
    let expected = DataAccessKind::NotFound {
        entity: "Bet",
        id: 999,
    };

    let update_err = dao.update(&ghost).unwrap_err();
    assert_eq!(update_err.data_access_kind(), Some(&expected));

    let delete_err = dao.delete(&ghost).unwrap_err();
    assert_eq!(delete_err.data_access_kind(), Some(&expected));

    assert!(dao.get_all().unwrap().is_empty());
}

fn assert_save_keeps_preset_identifiers<D: Dao<Bet>>(dao: &D) {
    let saved = dao.save(&unsaved_bet()).unwrap();
    let id = saved.id.unwrap();

    let duplicate = dao.save(&saved).unwrap_err();
    assert!(duplicate.is_backend());
    assert_eq!(dao.get_all().unwrap(), vec![saved.clone()]);

    let preset = Bet {
        id: Some(id + 100),
        ..unsaved_bet()
    };
    let inserted = dao.save(&preset).unwrap();
    assert_eq!(inserted.id, preset.id);
    assert_eq!(dao.find_one(preset.id).unwrap(), Some(inserted.clone()));

    dao.delete(&saved).unwrap();
    dao.delete(&inserted).unwrap();
    assert!(dao.get_all().unwrap().is_empty());
}

fn assert_contract<D: Dao<Bet>>(dao: &D) {
    assert_crud_lifecycle(dao);
    assert_rejects_missing_identifiers(dao);
    assert_unknown_identifier_handling(dao);
    assert_save_keeps_preset_identifiers(dao);
}

fn assert_finder_scenario<D: Dao<Bet> + BetFinder>(dao: &D) {
    let first = dao
        .save(&Bet::new("team1", "team2", "", match_day(2013, 12, 18)))
        .unwrap();
    let second = dao
        .save(&Bet::new("team1", "team2", "", match_day(2013, 12, 19)))
        .unwrap();
    let third = dao
        .save(&Bet::new("team1", "team2", "", match_day(2013, 12, 19)))
        .unwrap();

    let single = dao
        .find_bet_by_teams_and_date("team1", "team2", match_day(2013, 12, 18))
        .unwrap();
    assert_eq!(single, Some(first.clone()));

    let duplicate = dao
        .find_bet_by_teams_and_date("team1", "team2", match_day(2013, 12, 19))
        .unwrap_err();
    assert_eq!(
        duplicate.data_access_kind(),
        Some(&DataAccessKind::NonUniqueResult {
            entity: "Bet",
            count: 2
        })
    );

    let missing = dao
        .find_bet_by_teams_and_date("team1", "team2", match_day(2015, 12, 19))
        .unwrap();
    assert_eq!(missing, None);

    let by_teams = dao.find_bet_by_teams("team1", "team2").unwrap();
    assert_eq!(by_teams, vec![first, second, third]);

    assert!(dao.find_bet_by_teams("team2", "team1").unwrap().is_empty());
}

#[test]
fn session_dao_honours_contract() {
    let source = DataSource::in_memory().unwrap();
    assert_contract(&SessionDao::<Bet>::new(&source));
}

#[test]
fn context_dao_honours_contract() {
    let source = DataSource::in_memory().unwrap();
    assert_contract(&ContextDao::<Bet>::new(&source));
}

#[test]
fn mapper_dao_honours_contract() {
    let source = DataSource::in_memory().unwrap();
    assert_contract(&MapperDao::<Bet>::new(&source, bet_mapper_registry().unwrap()));
}

#[test]
fn template_dao_honours_contract() {
    let source = DataSource::in_memory().unwrap();
    assert_contract(&TemplateDao::<Bet>::new(&source));
}

#[test]
fn managed_dao_honours_contract() {
    let source = DataSource::in_memory().unwrap();
    assert_contract(&ManagedDao::<Bet>::new(OrmTemplate::new(&source)));
}

#[test]
fn session_dao_finders_follow_scenario() {
    let source = DataSource::in_memory().unwrap();
    assert_finder_scenario(&SessionDao::<Bet>::new(&source));
}

#[test]
fn context_dao_finders_follow_scenario() {
    let source = DataSource::in_memory().unwrap();
    assert_finder_scenario(&ContextDao::<Bet>::new(&source));
}

#[test]
fn mapper_dao_finders_follow_scenario() {
    let source = DataSource::in_memory().unwrap();
    assert_finder_scenario(&MapperDao::<Bet>::new(&source, bet_mapper_registry().unwrap()));
}

#[test]
fn template_dao_finders_follow_scenario() {
    let source = DataSource::in_memory().unwrap();
    assert_finder_scenario(&TemplateDao::<Bet>::new(&source));
}

#[test]
fn managed_dao_finders_follow_scenario() {
    let source = DataSource::in_memory().unwrap();
    assert_finder_scenario(&ManagedDao::<Bet>::new(OrmTemplate::new(&source)));
}

#[test]
fn adapters_share_one_data_source() {
    let source = DataSource::in_memory().unwrap();
    let session = SessionDao::<Bet>::new(&source);
    let template = TemplateDao::<Bet>::new(&source);

    let saved = session.save(&unsaved_bet()).unwrap();
    let loaded = template.find_one(saved.id).unwrap();
    assert_eq!(loaded, Some(saved));
}

#[test]
fn adapters_are_interchangeable_behind_dyn_dao() {
    let source = DataSource::in_memory().unwrap();
    let registry = bet_mapper_registry().unwrap();
    let session = SessionDao::<Bet>::new(&source);
    let context = ContextDao::<Bet>::new(&source);
    let mapper = MapperDao::<Bet>::new(&source, registry);
    let template = TemplateDao::<Bet>::new(&source);
    let managed = ManagedDao::<Bet>::new(OrmTemplate::new(&source));
    let daos: [&dyn Dao<Bet>; 5] = [&session, &context, &mapper, &template, &managed];

    for dao in &daos {
        dao.save(&unsaved_bet()).unwrap();
    }
    for dao in &daos {
        assert_eq!(dao.get_all().unwrap().len(), daos.len());
    }
}
