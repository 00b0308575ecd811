use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about = "Seed and query bets through a chosen DAO backend")]
pub struct Cli {
    /// DAO backend used for every operation
    #[arg(long, value_enum, default_value_t = Backend::Session)]
    pub backend: Backend,
    /// JSON data source config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Database file (overrides the config; a throwaway database when neither is set)
    #[arg(long)]
    pub database: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Session,
    Context,
    Mapper,
    Template,
    Managed,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed three bets and run both finders against them
    Scenario,
    /// Record a bet
    Add(AddArgs),
    /// Print every stored bet
    List,
    /// Look bets up by teams, optionally narrowed to one date
    Find(FindArgs),
    /// Replace the score of a stored bet
    Score(ScoreArgs),
    /// Delete a stored bet
    Remove(RemoveArgs),
}

#[derive(Parser, Clone)]
pub struct AddArgs {
    #[arg(long)]
    pub team1: String,
    #[arg(long)]
    pub team2: String,
    #[arg(long, default_value = "")]
    pub score: String,
    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    pub date: String,
}

#[derive(Parser, Clone)]
pub struct FindArgs {
    #[arg(long)]
    pub team1: String,
    #[arg(long)]
    pub team2: String,
    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Parser, Clone)]
pub struct ScoreArgs {
    pub id: i64,
    pub score: String,
}

#[derive(Parser, Clone)]
pub struct RemoveArgs {
    pub id: i64,
}
