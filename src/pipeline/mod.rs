//! Stage machine: applies a client's stage change and records it.
//!
//! A transition performs three coupled writes — the client row, an
//! immutable `stage_transitions` record and a `stage_change` log entry —
//! in one transaction, with the client row locked `FOR UPDATE` so two
//! concurrent transitions cannot both record the same `from_stage`.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::clients::Client;
use crate::interactions::{self, LogEntry};
use crate::shared::enums::{LogEntryType, Sentiment, Stage};
use crate::shared::error::ApiError;
use crate::shared::schema::{clients, stage_transitions};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = stage_transitions)]
pub struct StageTransition {
    pub id: Uuid,
    pub client_id: Uuid,
    pub actor_id: Uuid,
    pub from_stage: String,
    pub to_stage: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub new_stage: String,
    pub actor_id: Uuid,
}

/// Summary written into the audit log; names both stages.
pub fn transition_message(from_stage: &str, to_stage: &str) -> String {
    format!("Stage changed from {from_stage} to {to_stage}")
}

pub async fn transition_stage(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Membership is the only stage validation: any of the seven values is
    // a legal target, including the client's current stage.
    let to_stage = Stage::parse(&req.new_stage).ok_or_else(|| {
        ApiError::Validation(format!("unknown stage: {}", req.new_stage))
    })?;

    let now = Utc::now();
    let mut conn = state.conn.get()?;

    conn.transaction::<_, ApiError, _>(|conn| {
        let client: Client = clients::table
            .find(client_id)
            .for_update()
            .first(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    ApiError::NotFound("Client not found".to_string())
                }
                other => other.into(),
            })?;

        let from_stage = client.stage;

        diesel::update(clients::table.find(client_id))
            .set((
                clients::stage.eq(to_stage.as_str()),
                clients::updated_at.eq(now),
            ))
            .execute(conn)?;

        let transition = StageTransition {
            id: Uuid::new_v4(),
            client_id,
            actor_id: req.actor_id,
            from_stage: from_stage.clone(),
            to_stage: to_stage.as_str().to_string(),
            occurred_at: now,
        };
        diesel::insert_into(stage_transitions::table)
            .values(&transition)
            .execute(conn)?;

        let entry = LogEntry {
            id: Uuid::new_v4(),
            client_id,
            actor_id: req.actor_id,
            entry_type: LogEntryType::StageChange.as_str().to_string(),
            content: transition_message(&from_stage, to_stage.as_str()),
            highlights: None,
            challenges: None,
            next_action: None,
            script_used: None,
            sentiment: Sentiment::Neutral.as_str().to_string(),
            created_at: now,
        };
        interactions::append_in_tx(conn, &entry)
    })?;

    Ok(Json(serde_json::json!({})))
}

pub fn configure_pipeline_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/clients/:id/stage", post(transition_stage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_both_stages() {
        let msg = transition_message("joined_group", "opened_account");
        assert!(msg.contains("joined_group"));
        assert!(msg.contains("opened_account"));
    }

    #[test]
    fn re_entering_the_current_stage_is_a_valid_target() {
        // The machine enforces membership only; self-transitions and
        // backward moves still produce history.
        for stage in Stage::ALL {
            assert!(Stage::parse(stage.as_str()).is_some());
        }
        let msg = transition_message("deposited", "deposited");
        assert!(msg.contains("deposited"));
    }
}
