//! Task Planner Library
//!
//! Lists, labels, tasks and subtasks over SQLite, a view engine that derives
//! the visible task subset, and an optimistic client store that mirrors the
//! repository.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
pub mod view;
