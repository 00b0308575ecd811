//! CLI entry point for exercising the DAO backends.
//!
//! Every command prints one JSON document per line.

mod cli;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use cli::{Backend, Cli, Commands};
use daokit_core::{
    bet_mapper_registry, init_logging_from_config, load_config, Bet, BetFinder, BetService,
    ContextDao, Dao, DataSource, DataSourceConfig, ManagedDao, MapperDao, OrmTemplate,
    SessionDao, TemplateDao,
};
use log::info;
use serde_json::json;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_ref() {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config `{}`", path.display()))?,
        None => DataSourceConfig::default(),
    };
    if let Some(database) = cli.database.clone() {
        config.database_path = Some(database);
    }
    config.validate()?;
    init_logging_from_config(&config).map_err(|err| anyhow!(err))?;

    let source = DataSource::from_config(&config).context("opening data source")?;
    info!(
        "event=cli_start module=cli status=ok backend={:?} target={}",
        cli.backend,
        source.describe()
    );

    match cli.backend {
        Backend::Session => run(BetService::new(SessionDao::<Bet>::new(&source)), &cli.command),
        Backend::Context => run(BetService::new(ContextDao::<Bet>::new(&source)), &cli.command),
        Backend::Mapper => run(
            BetService::new(MapperDao::<Bet>::new(&source, bet_mapper_registry()?)),
            &cli.command,
        ),
        Backend::Template => run(BetService::new(TemplateDao::<Bet>::new(&source)), &cli.command),
        Backend::Managed => run(
            BetService::new(ManagedDao::<Bet>::new(OrmTemplate::new(&source))),
            &cli.command,
        ),
    }
}

fn run<D: Dao<Bet> + BetFinder>(service: BetService<D>, command: &Commands) -> Result<()> {
    match command {
        Commands::Scenario => scenario(&service),
        Commands::Add(args) => {
            let bet = service.place_bet(&args.team1, &args.team2, &args.score, parse_date(&args.date)?)?;
            print_json(&json!({ "saved": bet }))
        }
        Commands::List => {
            for bet in service.all_bets()? {
                print_json(&json!(bet))?;
            }
            Ok(())
        }
        Commands::Find(args) => match args.date.as_deref() {
            Some(date) => {
                let bet = service.bet_for_match(&args.team1, &args.team2, parse_date(date)?)?;
                print_json(&json!({ "found": bet }))
            }
            None => {
                for bet in service.bets_between_teams(&args.team1, &args.team2)? {
                    print_json(&json!(bet))?;
                }
                Ok(())
            }
        },
        Commands::Score(args) => {
            let bet = service.record_score(args.id, &args.score)?;
            print_json(&json!({ "updated": bet }))
        }
        Commands::Remove(args) => {
            let bet = service
                .bet(args.id)?
                .ok_or_else(|| anyhow!("no bet with id {}", args.id))?;
            service.cancel_bet(&bet)?;
            print_json(&json!({ "deleted": args.id }))
        }
    }
}

fn scenario<D: Dao<Bet> + BetFinder>(service: &BetService<D>) -> Result<()> {
    for date in ["2013-12-18", "2013-12-19", "2013-12-19"] {
        let bet = service.place_bet("team1", "team2", "", parse_date(date)?)?;
        print_json(&json!({ "saved": bet }))?;
    }

    for date in ["2013-12-18", "2013-12-19", "2015-12-19"] {
        let line = match service.bet_for_match("team1", "team2", parse_date(date)?) {
            Ok(found) => json!({ "date": date, "found": found }),
            Err(err) => json!({ "date": date, "error": err.to_string() }),
        };
        print_json(&line)?;
    }

    let bets = service.bets_between_teams("team1", "team2")?;
    print_json(&json!({ "by_teams": bets.len(), "bets": bets }))
}

fn parse_date(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date_time) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(date_time);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date `{value}`"))?;
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid date `{value}`"))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
