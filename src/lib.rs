//! Library crate for alphamac-live: the headless session and leaderboard
//! core behind the Alphamac game shell.

pub mod config;
pub mod error;
pub mod feed;
pub mod projection;
pub mod services;
pub mod state;
