pub mod config;
pub mod error;
pub mod export;
pub mod http_client;
pub mod logs;
pub mod migrations;
pub mod ratings;
pub mod roster;
pub mod scouting;
pub mod session;
pub mod table;
