use std::sync::Arc;

use boardsync::cache::{JsonFileStore, Store, SunsetCache};
use boardsync::canvas::{CanvasClient, CanvasHttpClient};
use boardsync::cli::{Cli, Command, MoodleArgs, SyncArgs};
use boardsync::config::{CanvasConfig, MoodleConfig, SyncConfig, TrelloConfig};
use boardsync::error::AppResult;
use boardsync::jira::JiraCli;
use boardsync::models::{CacheSnapshot, SourceSystem, SubjectsConfig};
use boardsync::moodle::{self, MoodleClient, MoodleHttpClient};
use boardsync::services::{
    AssignmentSource, BoardTasks, CanvasSource, ItemOutcome, JiraSyncService, MoodleSource,
    OfflineSource, SunsetService, SyncOptions, SyncReport, SyncService,
};
use boardsync::sunset::SunriseSunsetClient;
use boardsync::trello::{BoardClient, TrelloHttpClient};
use chrono::{Duration, Local, NaiveTime, Utc};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_MOODLE_WINDOW_DAYS: i64 = 14;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "boardsync=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let http = reqwest::Client::new();

    run(cli.command, http).await?;
    Ok(())
}

fn board_client(http: &reqwest::Client) -> AppResult<Arc<dyn BoardClient>> {
    Ok(Arc::new(TrelloHttpClient::new(TrelloConfig::new_from_env()?, http.clone())))
}

fn board_cache(config: &SyncConfig) -> Arc<JsonFileStore<CacheSnapshot>> {
    Arc::new(JsonFileStore::new(config.board_cache_file.clone()))
}

fn sunset_service(config: &SyncConfig, http: &reqwest::Client) -> SunsetService<Local> {
    SunsetService::new(
        Arc::new(SunriseSunsetClient::new(http.clone())),
        Arc::new(JsonFileStore::<SunsetCache>::new(config.sunset_cache_file.clone())),
        config.location,
        Local,
    )
}

async fn run(command: Command, http: reqwest::Client) -> AppResult<()> {
    let config = SyncConfig::new_from_env()?;

    match command {
        Command::Boards => {
            let tasks = BoardTasks::new(board_client(&http)?, board_cache(&config), config);
            for listing in tasks.list_boards().await? {
                println!("{} ({})", listing.board.name, listing.board.id);
                match listing.lists {
                    Some(lists) => lists
                        .iter()
                        .for_each(|l| println!("  - {} ({})", l.name, l.id)),
                    None => println!("  (lists unavailable)"),
                }
            }
        }
        Command::Refresh => {
            let tasks = BoardTasks::new(board_client(&http)?, board_cache(&config), config);
            let snapshot = tasks.refresh_cache().await?;
            println!(
                "Cached {} boards and {} lists",
                snapshot.boards.len(),
                snapshot.lists.len()
            );
        }
        Command::Cache => {
            let snapshot = board_cache(&config).load()?;
            for board in &snapshot.boards {
                println!("{} ({})", board.name, board.id);
                for list in snapshot.lists_for(&board.id) {
                    println!("  - {} ({})", list.name, list.id);
                }
            }
        }
        Command::Cards { board, list } => {
            let tasks = BoardTasks::new(board_client(&http)?, board_cache(&config), config);
            let cards = tasks.cards(&board, &list).await?;
            println!("{} cards in {} / {}", cards.len(), board, list);
            for card in cards {
                println!("\n{}\n{}\n{}", card.title, card.description, card.url);
            }
        }
        Command::DailyReset => {
            let tasks = BoardTasks::new(board_client(&http)?, board_cache(&config), config);
            let count = tasks.reset_daily(&Local::now()).await?;
            println!("Reset {} daily cards", count);
        }
        Command::CreateWeekly => {
            let subjects = SubjectsConfig::load(&config.subjects_file)?;
            let tasks = BoardTasks::new(board_client(&http)?, board_cache(&config), config);
            let cards = tasks.create_weekly(&subjects, &Local::now()).await?;
            for card in &cards {
                println!("Created {}", card.title);
            }
        }
        Command::TestCanvas => {
            let canvas = CanvasHttpClient::new(CanvasConfig::new_from_env()?, http);
            let user = canvas.current_user().await?;
            println!("Connected to Canvas as {}", user.name);
            println!("  Email: {}", user.email.as_deref().unwrap_or("-"));
            println!("  Login: {}", user.login_id.as_deref().unwrap_or("-"));
            println!("  ID: {}", user.id);
        }
        Command::SyncCanvas(args) => {
            let source = CanvasSource::new(Arc::new(CanvasHttpClient::new(
                CanvasConfig::new_from_env()?,
                http.clone(),
            )));
            sync_assignments(&source, &args, &config, &http).await?;
        }
        Command::TestMoodle => {
            let moodle = MoodleHttpClient::new(MoodleConfig::new_from_env()?, http);
            let user_id = moodle.site_info().await?;
            let courses = moodle.list_courses(user_id).await?;
            println!("Connected to Moodle as user {}", user_id);
            for course in courses {
                println!("  - {} [{}] ({})", course.full_name, course.short_name, course.id);
            }
        }
        Command::SyncMoodle(args) => {
            let source = moodle_source(&args, &http)?;
            sync_assignments(source.as_ref(), &args.sync, &config, &http).await?;
        }
        Command::SyncJira { dir } => {
            let service = JiraSyncService::new(
                board_client(&http)?,
                Arc::new(JiraCli::new()),
                config.jira_board.clone(),
                config.jira_browse_url.clone(),
            );
            let report = service.sync(&dir, &Local::now()).await?;
            println!("JIRA sync completed!");
            println!("Created: {} cards", report.created);
            println!("Updated: {} cards", report.updated);
            if report.failed > 0 {
                println!("Failed: {} tasks", report.failed);
            }
        }
        Command::Sundown => {
            let sunset = sunset_service(&config, &http);
            let tasks = BoardTasks::new(board_client(&http)?, board_cache(&config), config);
            let report = tasks.sundown_notification(&sunset, &Local::now()).await?;
            println!("Created {}", report.card.title);
            println!("  Sundown time: {}", report.sunset);
        }
        Command::Sunset => {
            let time = sunset_service(&config, &http).today_sunset(Utc::now()).await?;
            println!("Sunset today is at {}", time);
        }
    }
    Ok(())
}

fn moodle_source(args: &MoodleArgs, http: &reqwest::Client) -> AppResult<Box<dyn AssignmentSource>> {
    if let Some(path) = &args.test_data {
        info!("Using Moodle test data from {}", path.display());
        let batch = moodle::load_test_data(path)?;
        return Ok(Box::new(OfflineSource::new(SourceSystem::Moodle, batch)));
    }

    let until = match args.to_date()? {
        Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
        None => Utc::now() + Duration::days(DEFAULT_MOODLE_WINDOW_DAYS),
    };
    let config = MoodleConfig::new_from_env()?;
    let fetch_grades = config.fetch_grades;
    let client = Arc::new(MoodleHttpClient::new(config, http.clone()));
    Ok(Box::new(MoodleSource::new(client, until, fetch_grades)))
}

async fn sync_assignments(
    source: &dyn AssignmentSource,
    args: &SyncArgs,
    config: &SyncConfig,
    http: &reqwest::Client,
) -> AppResult<()> {
    let service = SyncService::new(
        board_client(http)?,
        board_cache(config),
        config.school_board.clone(),
        config.weekly_list.clone(),
    );
    let options = SyncOptions {
        dry_run: args.dry_run,
        export: args.export.clone(),
    };
    let report = service.sync(source, &options, Utc::now()).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry run] " } else { "" };
    for item in &report.items {
        let line = match &item.outcome {
            ItemOutcome::Created => format!("created  {}", item.title),
            ItemOutcome::Updated => format!("updated  {}", item.title),
            ItemOutcome::Skipped(reason) => format!("skipped  {} ({})", item.title, reason),
            ItemOutcome::Failed(reason) => format!("FAILED   {} ({})", item.title, reason),
        };
        println!("{}{}", prefix, line);
    }
    println!(
        "\n{}{} sync: {} created, {} updated, {} skipped, {} failed",
        prefix,
        report.source,
        report.created(),
        report.updated(),
        report.skipped(),
        report.failed()
    );
}
