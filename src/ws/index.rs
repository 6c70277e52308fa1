//! Per-player WebSocket: bridges the socket to the duel session
//! dispatcher one way and the player's Redis event channel the other.

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::{handle, Message};
use futures::StreamExt;
use redis::Client as RedisClient;
use sqlx::PgPool;
use uuid::Uuid;

use crate::duel::session::dispatch;
use crate::protocol::ClientMsg;

pub async fn ws_index(
    req: HttpRequest,
    body: web::Payload,
    db_pool: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, Error> {
    // 1 · player_id query param
    let pid_str = req
        .query_string()
        .split('&')
        .find_map(|kv| kv.strip_prefix("player_id="))
        .ok_or_else(|| actix_web::error::ErrorBadRequest("player_id missing"))?;
    let player_id =
        Uuid::parse_str(pid_str).map_err(|_| actix_web::error::ErrorBadRequest("bad UUID"))?;

    // 2 · handshake
    let (response, mut session, mut ws_stream) = handle(&req, body)?;

    // 3 · Redis subscribe: everything the duel session publishes for this
    //     player (snapshots, round starts/results, duel over) lands here.
    let mut pubsub = redis
        .get_async_pubsub()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("redis subscribe"))?;
    pubsub
        .subscribe(format!("player:{player_id}:events"))
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("redis subscribe"))?;

    let db = db_pool.get_ref().clone();
    let redis_client = redis.get_ref().clone();

    actix::spawn(async move {
        let mut redis_stream = pubsub.on_message();
        let mut current_duel: Option<Uuid> = None;

        loop {
            tokio::select! {
                // client → server
                Some(frame) = ws_stream.next() => {
                    if let Ok(Message::Text(text)) = frame {
                        if let Ok(cmsg) = serde_json::from_str::<ClientMsg>(&text) {
                            // A client never speaks for the other player;
                            // drop anything claiming a foreign player_id.
                            let claimed = match &cmsg {
                                ClientMsg::Ready { player_id, .. }
                                | ClientMsg::Answer { player_id, .. }
                                | ClientMsg::Resume { player_id, .. }
                                | ClientMsg::Disconnected { player_id, .. } => *player_id,
                            };
                            if claimed != player_id {
                                log::warn!("socket of {player_id} sent message for {claimed}; dropped");
                                continue;
                            }
                            current_duel = Some(cmsg.duel_id());
                            if let Err(e) = dispatch(db.clone(), redis_client.clone(), cmsg).await {
                                log::warn!("dispatch error: {e:?}");
                            }
                        }
                    }
                }
                // redis → client
                Some(msg) = redis_stream.next() => {
                    if let Ok(json) = msg.get_payload::<String>() {
                        if let Err(e) = session.text(json).await {
                            log::warn!("WS send failed for {player_id}: {e:?}");
                            break;
                        }
                    }
                }
                else => break,
            }
        }

        // On disconnect, tell the duel session the player is gone.
        if let Some(duel_id) = current_duel {
            let _ = dispatch(
                db.clone(),
                redis_client.clone(),
                ClientMsg::Disconnected { duel_id, player_id },
            )
            .await;
        }
        log::info!("WS closed for player {player_id}");
    });

    Ok(response)
}
