mod app;
mod auth;
mod cli;
mod db;
mod entities;
mod error;
mod identity;
mod model;
mod util;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

use crate::app::{ActivityEvent, App, LeaderboardEntry, UNKNOWN_COMPANY};
use crate::auth::TokenAuthorizer;
use crate::cli::{
    ActivityArgs, AdminCommand, ApplicationAdd, ApplicationCommand, BoardArg, Cli, ColumnCommand,
    Command, CompanyCommand, HistoryCommand, KindArg, LeaderboardArgs, ReferralCommand, StudyAdd,
    StudyCommand, StudyList, StudyMove,
};
use crate::entities::status_column;
use crate::error::AppError;
use crate::identity::{IdentityDirectory, NoDirectory, StaticDirectory};
use crate::model::{
    ApplicationInput, Board, ColumnChanges, ColumnInput, ItemKind, ReferralInput,
    StudyProblemInput, StudyQuery, DEFAULT_COLUMN_COLOR,
};
use crate::util::{day_name, format_application_detail, format_study_detail, parse_day};

const OWNER_FLAG: &str = "--owner";
const HOME_ENV: &str = "HUNTBOARD_HOME";

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), AppError> {
    let Cli {
        owner,
        home,
        command,
    } = Cli::parse();

    let home = resolve_home(home)?;
    let db_path = db::resolve_db_path(&home);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    tracing::debug!(path = %db_path.display(), "opened database");

    match command {
        Command::Leaderboard(args) => handle_leaderboard(&App::global(db), args).await,
        Command::Admin(command) => handle_admin(&App::global(db), command).await,
        Command::Column(command) => handle_column(&owned_app(db, owner)?, command).await,
        Command::Company(command) => handle_company(&owned_app(db, owner)?, command).await,
        Command::App(command) => handle_application(&owned_app(db, owner)?, command).await,
        Command::Study(command) => handle_study(&owned_app(db, owner)?, command).await,
        Command::Referral(command) => handle_referral(&owned_app(db, owner)?, command).await,
        Command::Activity(args) => handle_activity(&owned_app(db, owner)?, args).await,
        Command::History(command) => handle_history(&owned_app(db, owner)?, command).await,
    }
}

async fn handle_column(app: &App, command: ColumnCommand) -> Result<(), AppError> {
    match command {
        ColumnCommand::List(args) => {
            let columns = app.list_columns(board_from_arg(args.board)).await?;
            print_column_list(&columns);
        }
        ColumnCommand::Add(args) => {
            let column = app
                .create_column(ColumnInput {
                    board: board_from_arg(args.board),
                    name: args.name,
                    color: args
                        .color
                        .unwrap_or_else(|| DEFAULT_COLUMN_COLOR.to_string()),
                    is_default: args.default,
                })
                .await?;
            println!(
                "Created column ID: {}: {} (position {})",
                column.id, column.name, column.sort_order
            );
        }
        ColumnCommand::Update(args) => {
            let column = app
                .update_column(
                    args.id,
                    ColumnChanges {
                        name: args.name,
                        color: args.color,
                    },
                )
                .await?;
            println!("Updated column ID: {}: {}", column.id, column.name);
        }
        ColumnCommand::Remove(args) => {
            let removed = app.delete_column(args.id).await?;
            println!(
                "Column ID: {} removed (items removed: {}).",
                args.id, removed
            );
        }
        ColumnCommand::Move(args) => {
            let columns = app.move_column(args.id, args.position).await?;
            print_column_list(&columns);
        }
        ColumnCommand::Seed(args) => {
            let board = board_from_arg(args.board);
            let created = app.seed_default_columns(board).await?;
            if created.is_empty() {
                println!("Columns already exist for board {}.", board.as_str());
            } else {
                println!(
                    "Seeded {} default columns for board {}.",
                    created.len(),
                    board.as_str()
                );
            }
        }
    }
    Ok(())
}

async fn handle_company(app: &App, command: CompanyCommand) -> Result<(), AppError> {
    match command {
        CompanyCommand::Add(args) => {
            let company = app.add_company(args.name, args.website).await?;
            println!("Created company ID: {}: {}", company.id, company.name);
        }
        CompanyCommand::List => {
            let companies = app.list_companies().await?;
            if companies.is_empty() {
                println!("No companies found.");
                return Ok(());
            }
            println!("{:<4} {:<30} {}", "ID", "NAME", "WEBSITE");
            for company in companies {
                println!(
                    "{:<4} {:<30} {}",
                    company.id,
                    company.name,
                    company.website.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

async fn handle_application(app: &App, command: ApplicationCommand) -> Result<(), AppError> {
    match command {
        ApplicationCommand::Add(args) => handle_application_add(app, args).await?,
        ApplicationCommand::List(args) => {
            let items = app.list_applications(args.status).await?;
            if items.is_empty() {
                println!("No applications found.");
                return Ok(());
            }
            let names = column_names(app, Board::Applications).await?;
            let companies = company_names(app).await?;
            println!("{:<4} {:<14} {:<24} {}", "ID", "STATUS", "ROLE", "COMPANY");
            for item in items {
                let company = item
                    .company_id
                    .and_then(|id| companies.get(&id).map(String::as_str))
                    .or(item.company_name.as_deref())
                    .unwrap_or(UNKNOWN_COMPANY);
                println!(
                    "{:<4} {:<14} {:<24} {}",
                    item.id,
                    names
                        .get(&item.status_id)
                        .map(String::as_str)
                        .unwrap_or("?"),
                    item.role,
                    company
                );
            }
        }
        ApplicationCommand::Show(args) => {
            let item = app.get_application(args.id).await?;
            let column = app.get_column(item.status_id).await?;
            let company = match item.company_id {
                Some(id) => Some(app.get_company(id).await?.name),
                None => item.company_name.clone(),
            }
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
            let history = app.history_for(ItemKind::Application, item.id).await?;
            println!(
                "{}",
                format_application_detail(&item, &column.name, &company, &history)
            );
        }
        ApplicationCommand::Move(args) => {
            let item = app.transfer_application(args.id, args.status_id).await?;
            println!(
                "Application ID: {} moved to status ID: {}.",
                item.id, item.status_id
            );
        }
        ApplicationCommand::Remove(args) => {
            app.delete_application(args.id).await?;
            println!("Application ID: {} removed.", args.id);
        }
        ApplicationCommand::Count => {
            print_counts(app, Board::Applications).await?;
        }
    }
    Ok(())
}

async fn handle_application_add(app: &App, args: ApplicationAdd) -> Result<(), AppError> {
    let item = app
        .create_application(
            args.status_id,
            ApplicationInput {
                role: args.role,
                company_id: args.company_id,
                company_name: args.company,
                notes: args.notes,
            },
        )
        .await?;
    println!(
        "Created application ID: {} in status ID: {}",
        item.id, item.status_id
    );
    Ok(())
}

async fn handle_study(app: &App, command: StudyCommand) -> Result<(), AppError> {
    match command {
        StudyCommand::Add(args) => handle_study_add(app, args).await?,
        StudyCommand::List(args) => handle_study_list(app, args).await?,
        StudyCommand::Show(args) => {
            let item = app.get_study_problem(args.id).await?;
            let column = app.get_column(item.status_id).await?;
            let history = app.history_for(ItemKind::StudyProblem, item.id).await?;
            println!("{}", format_study_detail(&item, &column.name, &history));
        }
        StudyCommand::Move(args) => handle_study_move(app, args).await?,
        StudyCommand::Reorder(args) => {
            let (ids, indices): (Vec<i64>, Vec<i32>) =
                parse_reorder_pairs(&args.pairs)?.into_iter().unzip();
            let items = app.reorder_study_problems(&ids, &indices).await?;
            println!("Reordered {} study problems.", items.len());
            let names = column_names(app, Board::Study).await?;
            print_study_list(&items, &names);
        }
        StudyCommand::Remove(args) => {
            app.delete_study_problem(args.id).await?;
            println!("Study problem ID: {} removed.", args.id);
        }
        StudyCommand::Count => {
            print_counts(app, Board::Study).await?;
        }
        StudyCommand::Seed => {
            let created = app.seed_default_templates().await?;
            if created.is_empty() {
                println!("Study problems already exist.");
            } else {
                println!("Seeded {} study problems.", created.len());
            }
        }
    }
    Ok(())
}

async fn handle_study_add(app: &App, args: StudyAdd) -> Result<(), AppError> {
    let day = require_day(&args.day)?;
    let item = app
        .create_study_problem(
            args.status_id,
            day,
            StudyProblemInput {
                title: args.title,
                link: args.link,
                difficulty: args.difficulty,
            },
        )
        .await?;
    println!(
        "Created study problem ID: {} in status ID: {} on {}",
        item.id,
        item.status_id,
        day_name(item.day_of_week)
    );
    Ok(())
}

async fn handle_study_list(app: &App, args: StudyList) -> Result<(), AppError> {
    let day = args.day.as_deref().map(require_day).transpose()?;
    let items = app
        .list_study_problems(&StudyQuery {
            status_id: args.status,
            day_of_week: day,
        })
        .await?;
    if items.is_empty() {
        println!("No study problems found.");
        return Ok(());
    }
    let names = column_names(app, Board::Study).await?;
    print_study_list(&items, &names);
    Ok(())
}

async fn handle_study_move(app: &App, args: StudyMove) -> Result<(), AppError> {
    let day = args.day.as_deref().map(require_day).transpose()?;
    let item = app
        .transfer_study_problem(args.id, args.status_id, day)
        .await?;
    println!(
        "Study problem ID: {} moved to status ID: {} on {}.",
        item.id,
        item.status_id,
        day_name(item.day_of_week)
    );
    Ok(())
}

async fn handle_referral(app: &App, command: ReferralCommand) -> Result<(), AppError> {
    match command {
        ReferralCommand::Add(args) => {
            let referral = app
                .add_referral(ReferralInput {
                    name: args.name,
                    company_id: args.company_id,
                })
                .await?;
            println!("Created referral ID: {}: {}", referral.id, referral.name);
        }
        ReferralCommand::Done(args) => {
            let referral = app.complete_referral(args.id).await?;
            println!("Referral ID: {} marked done.", referral.id);
        }
        ReferralCommand::List => {
            let referrals = app.list_referrals().await?;
            if referrals.is_empty() {
                println!("No referrals found.");
                return Ok(());
            }
            println!("{:<4} {:<6} {:<30} {}", "ID", "DONE", "NAME", "COMPANY ID");
            for referral in referrals {
                println!(
                    "{:<4} {:<6} {:<30} {}",
                    referral.id,
                    if referral.completed { "yes" } else { "no" },
                    referral.name,
                    referral
                        .company_id
                        .map(|id| id.to_string())
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

async fn handle_activity(app: &App, args: ActivityArgs) -> Result<(), AppError> {
    let events = app.recent_activity(args.limit).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }
    print_activity(&events);
    Ok(())
}

async fn handle_leaderboard(app: &App, args: LeaderboardArgs) -> Result<(), AppError> {
    let directory: Box<dyn IdentityDirectory> = match args.names.as_deref() {
        Some(path) => Box::new(StaticDirectory::from_json_file(path)?),
        None => Box::new(NoDirectory),
    };
    let entries = app.leaderboard(directory.as_ref(), args.limit).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No referrals yet.");
        return Ok(());
    }
    print_leaderboard(&entries);
    Ok(())
}

async fn handle_history(app: &App, command: HistoryCommand) -> Result<(), AppError> {
    match command {
        HistoryCommand::Record(args) => {
            let kind = match args.kind {
                KindArg::Application => ItemKind::Application,
                KindArg::Study => ItemKind::StudyProblem,
            };
            if app
                .record_transition(kind, args.item_id, args.status_id)
                .await?
            {
                println!(
                    "Recorded {} ID: {} in status ID: {}.",
                    kind.as_str(),
                    args.item_id,
                    args.status_id
                );
            } else {
                println!("Already recorded.");
            }
        }
    }
    Ok(())
}

async fn handle_admin(app: &App, command: AdminCommand) -> Result<(), AppError> {
    match command {
        AdminCommand::BackfillHistory(args) => {
            let authorizer = TokenAuthorizer::from_env();
            let report = app
                .backfill_history(&authorizer, args.admin_token.as_deref())
                .await?;
            println!("{}", report.message);
        }
    }
    Ok(())
}

fn resolve_home(home: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = home {
        return non_empty_path(path, "--home");
    }
    if let Ok(value) = std::env::var(HOME_ENV) {
        return non_empty_path(PathBuf::from(value), HOME_ENV);
    }
    if let Ok(value) = std::env::var("HOME") {
        return Ok(Path::new(&value).join(".huntboard"));
    }
    Err(AppError::InvalidInput(format!(
        "unable to resolve data directory; pass --home or set {HOME_ENV}"
    )))
}

fn non_empty_path(path: PathBuf, source: &str) -> Result<PathBuf, AppError> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{source} is empty")));
    }
    Ok(path)
}

fn owned_app(db: DatabaseConnection, owner: Option<String>) -> Result<App, AppError> {
    Ok(App::new(db, resolve_owner(owner)?))
}

fn resolve_owner(owner: Option<String>) -> Result<String, AppError> {
    let value = owner.ok_or_else(|| AppError::InvalidInput(format!("{OWNER_FLAG} is required")))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{OWNER_FLAG} is empty")));
    }
    Ok(trimmed.to_string())
}

fn require_day(value: &str) -> Result<i32, AppError> {
    parse_day(value).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "invalid day '{value}'; use 0-6 (Sunday first) or a weekday name"
        ))
    })
}

fn parse_reorder_pairs(pairs: &[String]) -> Result<Vec<(i64, i32)>, AppError> {
    let mut parsed = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (id, index) = pair.split_once(':').ok_or_else(|| {
            AppError::InvalidInput(format!("reorder expects ID:INDEX, got '{pair}'"))
        })?;
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::InvalidInput(format!("invalid id in '{pair}'")))?;
        let index = index
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::InvalidInput(format!("invalid index in '{pair}'")))?;
        parsed.push((id, index));
    }
    Ok(parsed)
}

fn board_from_arg(arg: BoardArg) -> Board {
    match arg {
        BoardArg::Applications => Board::Applications,
        BoardArg::Study => Board::Study,
    }
}

async fn column_names(app: &App, board: Board) -> Result<HashMap<i64, String>, AppError> {
    Ok(app
        .list_columns(board)
        .await?
        .into_iter()
        .map(|column| (column.id, column.name))
        .collect())
}

async fn company_names(app: &App) -> Result<HashMap<i64, String>, AppError> {
    Ok(app
        .list_companies()
        .await?
        .into_iter()
        .map(|company| (company.id, company.name))
        .collect())
}

async fn print_counts(app: &App, board: Board) -> Result<(), AppError> {
    let columns = app.list_columns(board).await?;
    let counts = app.count_by_status(board).await?;
    println!("{:<4} {:<20} {}", "ID", "STATUS", "COUNT");
    for column in columns {
        println!(
            "{:<4} {:<20} {}",
            column.id,
            column.name,
            counts.get(&column.id).copied().unwrap_or(0)
        );
    }
    Ok(())
}

fn print_column_list(columns: &[status_column::Model]) {
    if columns.is_empty() {
        println!("No columns found.");
        return;
    }
    println!(
        "{:<4} {:<4} {:<20} {:<9} {}",
        "ID", "POS", "NAME", "COLOR", "DEFAULT"
    );
    for column in columns {
        println!(
            "{:<4} {:<4} {:<20} {:<9} {}",
            column.id,
            column.sort_order,
            column.name,
            column.color,
            if column.is_default { "yes" } else { "no" }
        );
    }
}

fn print_study_list(
    items: &[crate::entities::study_problem::Model],
    names: &HashMap<i64, String>,
) {
    println!(
        "{:<4} {:<14} {:<10} {:<4} {}",
        "ID", "STATUS", "DAY", "POS", "TITLE"
    );
    for item in items {
        let status = names
            .get(&item.status_id)
            .cloned()
            .unwrap_or_else(|| item.status_id.to_string());
        println!(
            "{:<4} {:<14} {:<10} {:<4} {}",
            item.id,
            status,
            day_name(item.day_of_week),
            item.order_index,
            item.title
        );
    }
}

fn print_activity(events: &[ActivityEvent]) {
    for event in events {
        println!(
            "- {} {} ({})",
            event.action, event.company, event.relative_time
        );
    }
}

fn print_leaderboard(entries: &[LeaderboardEntry]) {
    println!("{:<5} {:<24} {}", "RANK", "NAME", "REFERRALS");
    for (idx, entry) in entries.iter().enumerate() {
        println!(
            "{:<5} {:<24} {}",
            idx + 1,
            entry.display_name,
            entry.score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_pairs_parse() {
        let pairs = vec!["3:0".to_string(), " 7 : 1".to_string()];
        assert_eq!(
            parse_reorder_pairs(&pairs).expect("parse"),
            vec![(3, 0), (7, 1)]
        );
        let err = parse_reorder_pairs(&["3".to_string()]).expect_err("missing colon");
        assert!(matches!(err, AppError::InvalidInput(_)));
        let err = parse_reorder_pairs(&["x:1".to_string()]).expect_err("bad id");
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn owner_is_trimmed_and_required() {
        assert_eq!(
            resolve_owner(Some("  u1 ".to_string())).expect("owner"),
            "u1"
        );
        assert!(resolve_owner(None).is_err());
        assert!(resolve_owner(Some("  ".to_string())).is_err());
    }
}
