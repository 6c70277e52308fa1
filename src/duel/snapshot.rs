//! Serializable per-duel session snapshot stored in Redis after every
//! mutation, so a respawned session picks up mid-duel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{duel::record::Duel, protocol::ServerMsg};

/// Key = `duel:<duel_id>:snap` (JSON, TTL-bounded)
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub duel: Duel,
    pub ready_p1: bool,
    pub ready_p2: bool,
    /// Replayed to a resuming client so its UI catches up.
    pub last_round_result: Option<ServerMsg>,
}

pub fn snapshot_key(duel_id: Uuid) -> String {
    format!("duel:{duel_id}:snap")
}
