//! One async task per live duel — the single writer for all shared duel
//! fields (round, history, scores, status, winner).
//! ✔ runs the round countdown and auto-submits timed-out answers
//! ✔ resolves each round once both answers are present
//! ✔ persistent per-mutation snapshot in Redis, restored on respawn

use crate::{
    config::settings,
    db::duel_repo,
    duel::{
        advancer, clock,
        record::{Duel, DuelStatus, PlayerSlot},
        snapshot::{snapshot_key, SessionSnapshot},
        state::{phase_of, DuelPhase},
    },
    protocol::{ClientMsg, ServerMsg},
    questions,
};
use chrono::Utc;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use redis::{AsyncCommands, Client as RedisClient};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, sleep_until, Duration, Instant},
};
use uuid::Uuid;

/// In-memory map of active sessions: duel_id → sender
static SESSIONS: Lazy<DashMap<Uuid, mpsc::Sender<ClientMsg>>> = Lazy::new(DashMap::new);

#[derive(Debug)]
pub enum DispatchErr {
    ChannelClosed,
}

/// Route a client message to its duel's session, spawning the session on
/// first contact. A spawned session restores from the Redis snapshot if
/// one exists, else loads the duel row from Postgres.
pub async fn dispatch(db: PgPool, redis: RedisClient, msg: ClientMsg) -> Result<(), DispatchErr> {
    let duel_id = msg.duel_id();

    // Fast path - already running
    if let Some(tx) = SESSIONS.get(&duel_id) {
        return tx.send(msg).await.map_err(|_| DispatchErr::ChannelClosed);
    }

    // Spawn new actor
    let (tx, rx) = mpsc::channel::<ClientMsg>(64);
    tx.send(msg).await.map_err(|_| DispatchErr::ChannelClosed)?;
    SESSIONS.insert(duel_id, tx.clone());

    tokio::spawn(run(db, redis, duel_id, rx));
    Ok(())
}

async fn run(db: PgPool, redis: RedisClient, duel_id: Uuid, mut rx: mpsc::Receiver<ClientMsg>) {
    let snap_key = snapshot_key(duel_id);
    let redis_client = Arc::new(redis);

    //--------------------------------------------------------------------
    //   ❶  State initialisation  – snapshot restore, else Postgres load
    //--------------------------------------------------------------------
    let mut ready_p1 = false;
    let mut ready_p2 = false;
    let mut last_round_result = None::<ServerMsg>;

    let restored = load_snapshot(&redis_client, &snap_key).await;
    let mut duel: Duel = match restored {
        Some(snap) => {
            ready_p1 = snap.ready_p1;
            ready_p2 = snap.ready_p2;
            last_round_result = snap.last_round_result;
            log::info!(
                "duel {duel_id} restored from snapshot (round {})",
                snap.duel.current_round
            );
            snap.duel
        }
        None => match duel_repo::fetch_duel(&db, duel_id).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                log::warn!("dispatch for unknown duel {duel_id}");
                SESSIONS.remove(&duel_id);
                return;
            }
            Err(e) => {
                log::error!("loading duel {duel_id} failed: {e:?}");
                SESSIONS.remove(&duel_id);
                return;
            }
        },
    };

    // helper: publish via Redis
    let redis_pub = redis_client.clone();
    let publish = move |pid: Uuid, msg: ServerMsg| -> JoinHandle<()> {
        let rc = redis_pub.clone();
        tokio::spawn(async move {
            if let Ok(mut c) = rc.get_multiplexed_async_connection().await {
                let payload = match serde_json::to_string(&msg) {
                    Ok(p) => p,
                    Err(_) => return,
                };
                let _: () = c
                    .publish(format!("player:{pid}:events"), payload)
                    .await
                    .unwrap_or(());
            }
        })
    };

    // A restored mid-round duel gets its buzzer re-armed with whatever
    // time is left (possibly zero, firing immediately).
    let mut round_deadline = None::<Instant>;
    if phase_of(&duel) == DuelPhase::Playing {
        if let Some(start) = duel.round_start_time {
            round_deadline = Some(clock::round_deadline(
                start,
                Utc::now(),
                settings().round_duration_ms,
            ));
        }
    }

    // A round that was fully answered when the process went down is
    // settled right away instead of waiting for the next message.
    if phase_of(&duel) == DuelPhase::RoundResult {
        let finished = settle_round(
            &db,
            &redis_client,
            &publish,
            &snap_key,
            &mut duel,
            ready_p1,
            ready_p2,
            &mut last_round_result,
            &mut round_deadline,
        )
        .await;
        if finished {
            SESSIONS.remove(&duel_id);
            return;
        }
    }

    //--------------------------------------------------------------------
    //                         ❷  Main loop
    //--------------------------------------------------------------------
    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                match msg {
                    // ------- Connect / Reconnect -----------------------
                    ClientMsg::Ready { player_id, .. }
                    | ClientMsg::Resume { player_id, .. } => {
                        let replay = matches!(msg, ClientMsg::Resume { .. });
                        match duel.slot_of(player_id) {
                            Some(PlayerSlot::Player1) => ready_p1 = true,
                            Some(PlayerSlot::Player2) => ready_p2 = true,
                            None => {
                                log::warn!("player {player_id} is not part of duel {duel_id}");
                                continue;
                            }
                        }

                        // Catch the (re)joining client up.
                        publish(player_id, ServerMsg::Snapshot { duel: duel.clone() }).await.ok();
                        if replay {
                            if let Some(rr) = &last_round_result {
                                publish(player_id, rr.clone()).await.ok();
                            }
                        }
                        // Mid-round the snapshot only carries question ids;
                        // replay the question itself so the client can
                        // render what it is supposed to be answering.
                        if phase_of(&duel) == DuelPhase::Playing {
                            if let Some(start) = round_start_message(&duel) {
                                publish(player_id, start).await.ok();
                            }
                        }

                        // Both on the duel screen and no round running:
                        // start the clock.
                        if ready_p1
                            && ready_p2
                            && duel.status != DuelStatus::Completed
                            && duel.round_start_time.is_none()
                        {
                            if duel.begin_round(Utc::now()) {
                                round_deadline = Some(clock::round_deadline(
                                    duel.round_start_time.unwrap_or_else(Utc::now),
                                    Utc::now(),
                                    settings().round_duration_ms,
                                ));
                                announce_round(&publish, &duel).await;
                                persist(&db, &redis_client, &snap_key, &duel,
                                        ready_p1, ready_p2, &last_round_result).await;
                            }
                        }
                    }

                    // ------- Disconnect notice -------------------------
                    ClientMsg::Disconnected { player_id, .. } => {
                        match duel.slot_of(player_id) {
                            Some(PlayerSlot::Player1) => ready_p1 = false,
                            Some(PlayerSlot::Player2) => ready_p2 = false,
                            None => {}
                        }
                        // Nobody connected and no round running: park the
                        // session. The next message respawns it from the
                        // snapshot. Not a forfeit; the duel keeps its state.
                        if !ready_p1 && !ready_p2 && round_deadline.is_none() {
                            log::info!("both players away from duel {duel_id}; parking session");
                            break;
                        }
                    }

                    // ------- Answer submission -------------------------
                    ClientMsg::Answer { player_id, round, answer, elapsed_ms, .. } => {
                        let Some(slot) = duel.slot_of(player_id) else {
                            log::warn!("answer from non-participant {player_id} for duel {duel_id}");
                            continue;
                        };
                        if round != duel.current_round {
                            log::debug!("stale answer from {player_id} for round {round} ignored");
                            continue;
                        }
                        if phase_of(&duel) != DuelPhase::Playing {
                            log::debug!("answer from {player_id} outside playing phase ignored");
                            continue;
                        }
                        if !duel.write_answer(slot, answer, elapsed_ms, settings().round_duration_ms) {
                            log::debug!("repeat answer from {player_id} for round {} ignored", duel.current_round);
                            continue;
                        }

                        broadcast_snapshot(&publish, &duel).await;
                        if duel.both_answered() {
                            round_deadline = None;
                            let finished = settle_round(
                                &db, &redis_client, &publish, &snap_key,
                                &mut duel, ready_p1, ready_p2,
                                &mut last_round_result, &mut round_deadline,
                            ).await;
                            if finished {
                                break;
                            }
                        } else {
                            persist(&db, &redis_client, &snap_key, &duel,
                                    ready_p1, ready_p2, &last_round_result).await;
                        }
                    }
                }
            }

            // ------- Round buzzer -------------------------------------
            _ = sleep_until(round_deadline.unwrap_or_else(far_future)), if round_deadline.is_some() => {
                let dur = settings().round_duration_ms;
                if duel.player1.answer.is_none() {
                    duel.write_answer(PlayerSlot::Player1, String::new(), dur, dur);
                }
                if duel.player2.answer.is_none() {
                    duel.write_answer(PlayerSlot::Player2, String::new(), dur, dur);
                }
                round_deadline = None;

                broadcast_snapshot(&publish, &duel).await;
                let finished = settle_round(
                    &db, &redis_client, &publish, &snap_key,
                    &mut duel, ready_p1, ready_p2,
                    &mut last_round_result, &mut round_deadline,
                ).await;
                if finished {
                    break;
                }
            }
        }
    }

    // final cleanup
    SESSIONS.remove(&duel_id);
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400)
}

/// Resolve the current (both-answered) round, fold the tallies, and either
/// start the next round after the fixed result pause or complete the duel.
/// Returns `true` when the duel is over and the session should stop.
#[allow(clippy::too_many_arguments)]
async fn settle_round(
    db: &PgPool,
    redis: &Arc<RedisClient>,
    publish: &impl Fn(Uuid, ServerMsg) -> JoinHandle<()>,
    snap_key: &str,
    duel: &mut Duel,
    ready_p1: bool,
    ready_p2: bool,
    last_round_result: &mut Option<ServerMsg>,
    round_deadline: &mut Option<Instant>,
) -> bool {
    // A missing question means the round can't be judged; settle the duel
    // on the rounds already folded rather than guessing at correctness.
    let correct_answer = match questions::get_question(&duel.sport, duel.current_question_id()) {
        Some(q) => q.correct_answer,
        None => {
            log::error!(
                "question {} missing from cache for duel {}; finishing early",
                duel.current_question_id(),
                duel.id
            );
            finish_duel(db, redis, publish, snap_key, duel).await;
            return true;
        }
    };

    let Some(settlement) = advancer::resolve_round(duel, &correct_answer) else {
        return false;
    };
    duel.fold_round(&settlement);

    let rr = ServerMsg::RoundResult {
        duel_id: duel.id,
        correct_answer,
        settlement,
    };
    *last_round_result = Some(rr.clone());
    publish(duel.player1_id, rr.clone()).await.ok();
    publish(duel.player2_id, rr).await.ok();

    if duel.is_final_round() {
        finish_duel(db, redis, publish, snap_key, duel).await;
        return true;
    }

    // Advance before anything is persisted: once the snapshot hits Redis
    // the round's answers are gone, so a session restored from it can
    // never fold the same round twice.
    let advanced = questions::pick_unused_question_id(&duel.sport, &duel.question_history)
        .map(|qid| advancer::apply_next_question(duel, qid))
        .unwrap_or(false);
    if !advanced {
        log::error!("no next question for duel {}; finishing early", duel.id);
        finish_duel(db, redis, publish, snap_key, duel).await;
        return true;
    }
    persist(db, redis, snap_key, duel, ready_p1, ready_p2, last_round_result).await;

    // Hold the result on screen, then start the next round's clock.
    sleep(Duration::from_millis(settings().round_result_pause_ms)).await;
    duel.begin_round(Utc::now());
    *round_deadline = Some(clock::round_deadline(
        duel.round_start_time.unwrap_or_else(Utc::now),
        Utc::now(),
        settings().round_duration_ms,
    ));
    announce_round(publish, duel).await;
    persist(db, redis, snap_key, duel, ready_p1, ready_p2, last_round_result).await;
    false
}

/// Terminal write: winner from the cumulative tallies, idempotent in the
/// record and in Postgres, announced to both players.
async fn finish_duel(
    db: &PgPool,
    redis: &Arc<RedisClient>,
    publish: &impl Fn(Uuid, ServerMsg) -> JoinHandle<()>,
    snap_key: &str,
    duel: &mut Duel,
) {
    let winner = advancer::final_winner_id(duel);
    duel.complete(winner);

    if let Err(e) = duel_repo::finish(db, duel, winner).await {
        log::error!("persisting finished duel {} failed: {e:?}", duel.id);
    }

    let over = ServerMsg::DuelOver {
        duel_id: duel.id,
        winner: duel.winner_id,
    };
    broadcast_snapshot(publish, duel).await;
    publish(duel.player1_id, over.clone()).await.ok();
    publish(duel.player2_id, over).await.ok();

    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let _: () = conn.del(snap_key).await.unwrap_or(());
    }
}

/// The current round's start message, if its question is cached. Sent
/// when a round begins and replayed to a client that (re)joins mid-round.
pub fn round_start_message(duel: &Duel) -> Option<ServerMsg> {
    let q = questions::get_question(&duel.sport, duel.current_question_id())?;
    Some(ServerMsg::RoundStart {
        duel_id: duel.id,
        round: duel.current_round,
        question: q.view(),
    })
}

/// Push the new round to both players: snapshot plus the question (with
/// the correct answer withheld).
async fn announce_round(publish: &impl Fn(Uuid, ServerMsg) -> JoinHandle<()>, duel: &Duel) {
    broadcast_snapshot(publish, duel).await;
    match round_start_message(duel) {
        Some(start) => {
            publish(duel.player1_id, start.clone()).await.ok();
            publish(duel.player2_id, start).await.ok();
        }
        None => log::error!(
            "question {} missing from cache for duel {}",
            duel.current_question_id(),
            duel.id
        ),
    }
}

/// Full-record push to both players (the store's resend-everything-on-
/// change contract).
async fn broadcast_snapshot(publish: &impl Fn(Uuid, ServerMsg) -> JoinHandle<()>, duel: &Duel) {
    let snap = ServerMsg::Snapshot { duel: duel.clone() };
    publish(duel.player1_id, snap.clone()).await.ok();
    publish(duel.player2_id, snap).await.ok();
}

/// Write-through: duel row to Postgres, session snapshot to Redis.
async fn persist(
    db: &PgPool,
    redis: &Arc<RedisClient>,
    snap_key: &str,
    duel: &Duel,
    ready_p1: bool,
    ready_p2: bool,
    last_round_result: &Option<ServerMsg>,
) {
    if let Err(e) = duel_repo::save_progress(db, duel).await {
        log::error!("persisting duel {} failed: {e:?}", duel.id);
    }
    let snap = SessionSnapshot {
        duel: duel.clone(),
        ready_p1,
        ready_p2,
        last_round_result: last_round_result.clone(),
    };
    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        if let Ok(json) = serde_json::to_string(&snap) {
            let _: () = conn
                .set_ex(snap_key, json, settings().snapshot_ttl)
                .await
                .unwrap_or(());
        }
    }
}

async fn load_snapshot(redis: &Arc<RedisClient>, key: &str) -> Option<SessionSnapshot> {
    let mut conn = redis.get_multiplexed_async_connection().await.ok()?;
    let json: Option<String> = conn.get(key).await.ok()?;
    serde_json::from_str(&json?).ok()
}
