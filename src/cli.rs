use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "huntboard",
    version,
    about = "Track job applications, referrals and study problems on ordered boards"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "ID",
        help = "Owner (user) identifier supplied by the identity provider"
    )]
    pub owner: Option<String>,
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $HUNTBOARD_HOME, then ~/.huntboard)"
    )]
    pub home: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Column(ColumnCommand),
    #[command(subcommand)]
    Company(CompanyCommand),
    #[command(subcommand)]
    App(ApplicationCommand),
    #[command(subcommand)]
    Study(StudyCommand),
    #[command(subcommand)]
    Referral(ReferralCommand),
    Activity(ActivityArgs),
    Leaderboard(LeaderboardArgs),
    #[command(subcommand)]
    History(HistoryCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
pub enum ColumnCommand {
    List(ColumnList),
    Add(ColumnAdd),
    Update(ColumnUpdate),
    Remove(ColumnRemove),
    Move(ColumnMove),
    Seed(ColumnSeed),
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    Add(CompanyAdd),
    List,
}

#[derive(Subcommand, Debug)]
pub enum ApplicationCommand {
    Add(ApplicationAdd),
    List(ApplicationList),
    Show(ItemId),
    Move(ApplicationMove),
    Remove(ItemId),
    Count,
}

#[derive(Subcommand, Debug)]
pub enum StudyCommand {
    Add(StudyAdd),
    List(StudyList),
    Show(ItemId),
    Move(StudyMove),
    Reorder(StudyReorder),
    Remove(ItemId),
    Count,
    #[command(about = "Add a starter week of problems if the board has none")]
    Seed,
}

#[derive(Subcommand, Debug)]
pub enum ReferralCommand {
    Add(ReferralAdd),
    Done(ItemId),
    List,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    Record(HistoryRecord),
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    #[command(name = "backfill-history")]
    BackfillHistory(BackfillHistory),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum BoardArg {
    #[default]
    Applications,
    Study,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Application,
    Study,
}

#[derive(Args, Debug)]
pub struct ColumnList {
    #[arg(long, value_enum, default_value_t)]
    pub board: BoardArg,
}

#[derive(Args, Debug)]
pub struct ColumnAdd {
    pub name: String,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, value_enum, default_value_t)]
    pub board: BoardArg,
    #[arg(long, help = "Protect the column from rename and removal")]
    pub default: bool,
}

#[derive(Args, Debug)]
pub struct ColumnUpdate {
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug)]
pub struct ColumnRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ColumnMove {
    pub id: i64,
    #[arg(
        allow_negative_numbers = true,
        help = "Zero-based target position; clamped into range"
    )]
    pub position: i64,
}

#[derive(Args, Debug)]
pub struct ColumnSeed {
    #[arg(long, value_enum, default_value_t)]
    pub board: BoardArg,
}

#[derive(Args, Debug)]
pub struct CompanyAdd {
    pub name: String,
    #[arg(long)]
    pub website: Option<String>,
}

#[derive(Args, Debug)]
pub struct ItemId {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ApplicationAdd {
    pub status_id: i64,
    pub role: String,
    #[arg(long, conflicts_with = "company")]
    pub company_id: Option<i64>,
    #[arg(long, help = "Free-text company name when no company record exists")]
    pub company: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplicationList {
    #[arg(long, value_name = "STATUS_ID")]
    pub status: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ApplicationMove {
    pub id: i64,
    pub status_id: i64,
}

#[derive(Args, Debug)]
pub struct StudyAdd {
    pub status_id: i64,
    #[arg(help = "Day of week: 0-6 (Sunday first) or a weekday name")]
    pub day: String,
    pub title: String,
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long)]
    pub difficulty: Option<String>,
}

#[derive(Args, Debug)]
pub struct StudyList {
    #[arg(long, value_name = "STATUS_ID")]
    pub status: Option<i64>,
    #[arg(long)]
    pub day: Option<String>,
}

#[derive(Args, Debug)]
pub struct StudyMove {
    pub id: i64,
    pub status_id: i64,
    #[arg(long)]
    pub day: Option<String>,
}

#[derive(Args, Debug)]
pub struct StudyReorder {
    #[arg(value_name = "ID:INDEX", num_args = 1.., required = true)]
    pub pairs: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReferralAdd {
    pub name: String,
    #[arg(long)]
    pub company_id: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ActivityArgs {
    #[arg(long, default_value_t = crate::model::DEFAULT_ACTIVITY_LIMIT)]
    pub limit: usize,
    #[arg(long, help = "Print events as JSON")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    #[arg(long, default_value_t = crate::model::DEFAULT_LEADERBOARD_LIMIT)]
    pub limit: usize,
    #[arg(long, help = "Print entries as JSON")]
    pub json: bool,
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON object mapping user ids to display names"
    )]
    pub names: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HistoryRecord {
    #[arg(value_enum)]
    pub kind: KindArg,
    pub item_id: i64,
    pub status_id: i64,
}

#[derive(Args, Debug)]
pub struct BackfillHistory {
    #[arg(long, value_name = "TOKEN")]
    pub admin_token: Option<String>,
}
