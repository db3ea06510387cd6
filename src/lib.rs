#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod corpus_store;
pub mod error;
pub mod formats;
pub mod history;
pub mod json_store;
pub mod loader;
pub mod logging;
pub mod preferences;
pub mod schedule;
pub mod selector;
pub mod today_cache;
