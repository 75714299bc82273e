//! Task Planner
//!
//! Serves the JSON API and offers a few command-line shortcuts over the
//! same database.

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use task_planner::api;
use task_planner::cli::{Cli, Command, ServeArgs, TasksArgs};
use task_planner::client::{ClientStore, hydrate};
use task_planner::config::Config;
use task_planner::db::Database;
use task_planner::logging::{self, LogTarget};
use task_planner::types::Task;
use task_planner::view::ViewEngine;
use tracing::info;

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => Config::load_or_default(),
    };

    if let Some(db_path) = &cli.database {
        config.server.db_path = PathBuf::from(db_path);
    }
    Ok(config)
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    Database::open(&config.server.db_path)
}

async fn serve(config: &Config, args: &ServeArgs) -> Result<()> {
    let db = Arc::new(open_database(config)?);
    let host = args.host.as_deref().unwrap_or(&config.server.host);
    let port = args.port.unwrap_or(config.server.port);

    let (shutdown_tx, addr) = api::start_server(db, host, port)
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    info!(%addr, "Task planner ready");

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    Ok(())
}

fn format_date<Tz: TimeZone>(tz: &Tz, ms: Option<i64>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ms.and_then(|ms| tz.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_task(store: &ClientStore, task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    let (done, total) = store.subtask_progress(&task.id);
    let progress = if total > 0 {
        format!(" {}/{}", done, total)
    } else {
        String::new()
    };
    let labels: Vec<&str> = store
        .labels_of(&task.id)
        .into_iter()
        .map(|l| l.name.as_str())
        .collect();
    let labels = if labels.is_empty() {
        String::new()
    } else {
        format!(" [{}]", labels.join(", "))
    };

    println!(
        "[{}] {:<10} {:<6} {}{}{}  ({})",
        mark,
        format_date(&Local, task.date),
        task.priority,
        task.name,
        progress,
        labels,
        task.id
    );
}

async fn tasks(config: &Config, args: &TasksArgs) -> Result<()> {
    let db = open_database(config)?;
    let mut store = ClientStore::with_selector(args.apply(config.view.selector()));
    hydrate(&mut store, &db).await?;

    let engine = ViewEngine::new(config.view.ranker());
    let visible = store.visible_tasks(&engine, &Local::now());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    if visible.is_empty() {
        println!("No tasks.");
    }
    for task in visible {
        print_task(&store, task);
    }
    Ok(())
}

async fn complete(config: &Config, task_id: &str) -> Result<()> {
    let db = open_database(config)?;
    let mut store = ClientStore::new();
    hydrate(&mut store, &db).await?;

    let pending = store.toggle_task_completion(task_id)?;
    let outcome = pending.commit(&db).await;
    store.settle(outcome)?;

    if let Some(task) = store.task(task_id) {
        let state = if task.completed { "completed" } else { "reopened" };
        println!("{} {}", state, task.name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let config = load_config(&cli)?;

    match &cli.command {
        None => serve(&config, &ServeArgs::default()).await,
        Some(Command::Serve(args)) => serve(&config, args).await,
        Some(Command::Tasks(args)) => tasks(&config, args).await,
        Some(Command::Complete { task_id }) => complete(&config, task_id).await,
    }
}
