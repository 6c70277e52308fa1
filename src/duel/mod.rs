pub mod advancer;
pub mod clock;
pub mod outcome;
pub mod record;
pub mod session;
pub mod snapshot;
pub mod state;
