pub mod cache;
pub mod canvas;
pub mod cli;
pub mod config;
pub mod error;
pub mod jira;
pub mod models;
pub mod moodle;
pub mod services;
pub mod sunset;
pub mod trello;
