pub mod duels;
pub mod health;
pub mod routes;
