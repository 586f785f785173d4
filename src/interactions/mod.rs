//! Append-only interaction timeline. Every append also moves the client's
//! `last_interaction_at` forward inside the same transaction.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::clients::touch_last_interaction;
use crate::shared::enums::{LogEntryType, Sentiment};
use crate::shared::error::{found_or_404, ApiError};
use crate::shared::schema::{clients, interaction_log};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = interaction_log)]
pub struct LogEntry {
    pub id: Uuid,
    pub client_id: Uuid,
    pub actor_id: Uuid,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub content: String,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub next_action: Option<String>,
    pub script_used: Option<String>,
    pub sentiment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AppendLogRequest {
    pub actor_id: Uuid,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub content: String,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub next_action: Option<String>,
    pub script_used: Option<String>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryLogsParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AppendLogResponse {
    pub log_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

/// Validate an append request into a storable entry.
///
/// Caller-initiated `interaction` entries must carry content;
/// `system_alert` entries are exempt. `stage_change` entries are only ever
/// generated by the stage machine and cannot be appended directly.
pub fn build_entry(
    client_id: Uuid,
    req: AppendLogRequest,
    now: DateTime<Utc>,
) -> Result<LogEntry, ApiError> {
    let entry_type = match req.entry_type.as_deref() {
        None => LogEntryType::Interaction,
        Some(t) => LogEntryType::parse(t)
            .ok_or_else(|| ApiError::Validation(format!("unknown log entry type: {t}")))?,
    };
    if entry_type == LogEntryType::StageChange {
        return Err(ApiError::Validation(
            "stage_change entries are generated by stage transitions".to_string(),
        ));
    }
    if entry_type == LogEntryType::Interaction && req.content.trim().is_empty() {
        return Err(ApiError::Validation("content is required".to_string()));
    }
    let sentiment = match req.sentiment.as_deref() {
        None => Sentiment::default(),
        Some(s) => Sentiment::parse(s)
            .ok_or_else(|| ApiError::Validation(format!("unknown sentiment: {s}")))?,
    };

    Ok(LogEntry {
        id: Uuid::new_v4(),
        client_id,
        actor_id: req.actor_id,
        entry_type: entry_type.as_str().to_string(),
        content: req.content,
        highlights: req.highlights,
        challenges: req.challenges,
        next_action: req.next_action,
        script_used: req.script_used,
        sentiment: sentiment.as_str().to_string(),
        created_at: now,
    })
}

/// Insert an entry and touch the client, inside the caller's transaction.
/// The caller must already hold the client row lock.
pub fn append_in_tx(conn: &mut PgConnection, entry: &LogEntry) -> Result<(), ApiError> {
    diesel::insert_into(interaction_log::table)
        .values(entry)
        .execute(conn)?;
    touch_last_interaction(conn, entry.client_id, entry.created_at)?;
    Ok(())
}

pub fn recent_entries(
    conn: &mut PgConnection,
    client_id: Uuid,
    limit: i64,
) -> Result<Vec<LogEntry>, ApiError> {
    let entries = interaction_log::table
        .filter(interaction_log::client_id.eq(client_id))
        .order(interaction_log::created_at.desc())
        .limit(limit)
        .load(conn)?;
    Ok(entries)
}

pub async fn append_log(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<Uuid>,
    Json(req): Json<AppendLogRequest>,
) -> Result<Json<AppendLogResponse>, ApiError> {
    let entry = build_entry(client_id, req, Utc::now())?;
    let mut conn = state.conn.get()?;

    conn.transaction::<_, ApiError, _>(|conn| {
        // Lock the client row so concurrent appends and transitions
        // serialize per client.
        clients::table
            .find(client_id)
            .select(clients::id)
            .for_update()
            .first::<Uuid>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    ApiError::NotFound("Client not found".to_string())
                }
                other => other.into(),
            })?;

        append_in_tx(conn, &entry)
    })?;

    Ok(Json(AppendLogResponse { log_id: entry.id }))
}

pub async fn query_logs(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<Uuid>,
    Query(params): Query<QueryLogsParams>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).max(0);
    let mut conn = state.conn.get()?;

    let client: Option<Uuid> = clients::table
        .find(client_id)
        .select(clients::id)
        .first(&mut conn)
        .optional()?;
    found_or_404(client, "Client")?;

    let logs = recent_entries(&mut conn, client_id, limit)?;
    Ok(Json(LogsResponse { logs }))
}

pub fn configure_interactions_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/clients/:id/logs", get(query_logs).post(append_log))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str) -> AppendLogRequest {
        AppendLogRequest {
            actor_id: Uuid::new_v4(),
            entry_type: None,
            content: content.to_string(),
            highlights: None,
            challenges: None,
            next_action: None,
            script_used: None,
            sentiment: None,
        }
    }

    #[test]
    fn plain_interaction_defaults_type_and_sentiment() {
        let entry = build_entry(Uuid::new_v4(), request("called about account opening"), Utc::now())
            .expect("valid entry");
        assert_eq!(entry.entry_type, "interaction");
        assert_eq!(entry.sentiment, "neutral");
    }

    #[test]
    fn empty_content_is_rejected_for_interactions() {
        let err = build_entry(Uuid::new_v4(), request("   "), Utc::now());
        assert!(matches!(err, Err(ApiError::Validation(_))));
    }

    #[test]
    fn system_alert_may_have_empty_content() {
        let mut req = request("");
        req.entry_type = Some("system_alert".to_string());
        let entry = build_entry(Uuid::new_v4(), req, Utc::now()).expect("system alert");
        assert_eq!(entry.entry_type, "system_alert");
    }

    #[test]
    fn stage_change_cannot_be_appended_directly() {
        let mut req = request("moved along");
        req.entry_type = Some("stage_change".to_string());
        assert!(matches!(
            build_entry(Uuid::new_v4(), req, Utc::now()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn unknown_sentiment_is_rejected() {
        let mut req = request("follow-up call");
        req.sentiment = Some("ecstatic".to_string());
        assert!(matches!(
            build_entry(Uuid::new_v4(), req, Utc::now()),
            Err(ApiError::Validation(_))
        ));
    }
}
