//! Wire-protocol shared by client, WS handler and duel session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duel::{advancer::RoundSettlement, record::Duel};

// ---------- client → server ----------
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Player is on the duel screen and ready to play.
    Ready { duel_id: Uuid, player_id: Uuid },
    /// One answer for round `round`. Empty string = gave no answer. The
    /// round tag rejects answers that arrive after the round advanced.
    Answer {
        duel_id: Uuid,
        player_id: Uuid,
        round: u32,
        answer: String,
        elapsed_ms: i64,
    },
    /// Sent by a client that lost its socket and re-opened a new one.
    Resume { duel_id: Uuid, player_id: Uuid },
    /// Emitted internally by the WS layer when a socket closes.
    Disconnected { duel_id: Uuid, player_id: Uuid },
}

impl ClientMsg {
    pub fn duel_id(&self) -> Uuid {
        match self {
            ClientMsg::Ready { duel_id, .. }
            | ClientMsg::Answer { duel_id, .. }
            | ClientMsg::Resume { duel_id, .. }
            | ClientMsg::Disconnected { duel_id, .. } => *duel_id,
        }
    }
}

/// Question as shown to a player: the correct answer is withheld.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionView {
    pub id: i32,
    pub text: String,
    pub options: Vec<String>,
    pub difficulty: i32,
}

// ---------- server → client ----------
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Full duel record, pushed to both players on every mutation.
    Snapshot { duel: Duel },
    RoundStart {
        duel_id: Uuid,
        round: u32,
        question: QuestionView,
    },
    RoundResult {
        duel_id: Uuid,
        correct_answer: String,
        settlement: RoundSettlement,
    },
    DuelOver {
        duel_id: Uuid,
        /// `None` = tie.
        winner: Option<Uuid>,
    },
}
