pub mod duel_repo;
pub mod models;
