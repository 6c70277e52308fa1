//! Duel creation (challenge) and read-back.

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::duel_repo, duel::record::Duel, duel::state, questions};

#[derive(Deserialize)]
pub struct ChallengeRequest {
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub sport: String,
    pub question_count: u32,
}

/// POST /api/duels/challenge
///
/// Creates the duel in `waiting` with round 1's question already picked,
/// so the question history holds one id per round from the start. The
/// duel goes live once both players open their WebSocket and send Ready.
#[post("/duels/challenge")]
pub async fn challenge(info: web::Json<ChallengeRequest>, db: web::Data<PgPool>) -> impl Responder {
    if info.player1_id == info.player2_id {
        return HttpResponse::BadRequest().body("a duel needs two distinct players");
    }
    if info.question_count < 1 {
        return HttpResponse::BadRequest().body("question_count must be at least 1");
    }

    let Some(first_q) = questions::pick_unused_question_id(&info.sport, &[]) else {
        return HttpResponse::UnprocessableEntity()
            .body(format!("no questions available for sport {:?}", info.sport));
    };

    let duel = Duel::new(
        Uuid::new_v4(),
        info.sport.clone(),
        info.player1_id,
        info.player2_id,
        info.question_count,
        first_q,
    );

    match duel_repo::create_duel(&db, &duel).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "duel_id": duel.id })),
        Err(e) => {
            log::error!("creating duel failed: {e:?}");
            HttpResponse::InternalServerError().body("could not create duel")
        }
    }
}

/// GET /api/duels/{duel_id} — current record plus the derived phase.
#[get("/duels/{duel_id}")]
pub async fn get_duel(path: web::Path<Uuid>, db: web::Data<PgPool>) -> impl Responder {
    let duel_id = path.into_inner();
    match duel_repo::fetch_duel(&db, duel_id).await {
        Ok(Some(duel)) => HttpResponse::Ok().json(serde_json::json!({
            "duel": duel,
            "phase": state::phase_of(&duel),
        })),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => {
            log::error!("fetching duel {duel_id} failed: {e:?}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(challenge).service(get_duel);
}
