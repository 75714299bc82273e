//! CLI command definitions for task-planner
//!
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::view::{Selector, View};
use clap::{Args, Parser, Subcommand};

/// Personal task planner: HTTP API and command-line tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server (default if no subcommand given)
    Serve(ServeArgs),

    /// Print the tasks visible under a view
    Tasks(TasksArgs),

    /// Toggle a task's completion
    Complete {
        /// Task ID
        task_id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub struct TasksArgs {
    /// Time window (overrides config)
    #[arg(long, value_enum)]
    pub view: Option<View>,

    /// Only tasks in this list
    #[arg(long)]
    pub list: Option<String>,

    /// Only tasks carrying this label (takes precedence over --list)
    #[arg(long)]
    pub label: Option<String>,

    /// Fuzzy search over names and descriptions
    #[arg(short, long)]
    pub search: Option<String>,

    /// Hide completed tasks
    #[arg(long)]
    pub hide_completed: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl TasksArgs {
    /// Layer these flags over the configured starting selector.
    pub fn apply(&self, mut selector: Selector) -> Selector {
        if let Some(view) = self.view {
            selector.view = view;
        }
        selector.selected_list_id = self.list.clone();
        selector.selected_label_id = self.label.clone();
        if let Some(query) = &self.search {
            selector.search_query = query.clone();
        }
        if self.hide_completed {
            selector.show_completed = false;
        }
        selector
    }
}
