pub mod config;
pub mod db;
pub mod duel;
pub mod http;
pub mod metrics;
pub mod protocol;
pub mod questions;
pub mod ws;
