//! Client registry: identity, current pipeline stage, temperature and the
//! archival flag. Owns the `clients` table; the stage machine and the
//! interaction log perform their coupled writes against it.

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

use crate::interactions::{self, LogEntry};
use crate::shared::enums::{Stage, StageOrder, TemperatureLevel};
use crate::shared::error::{found_or_404, ApiError};
use crate::shared::schema::clients;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = clients)]
pub struct Client {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub wechat: Option<String>,
    pub email: Option<String>,
    pub source: String,
    pub stage: String,
    pub temperature_score: i32,
    pub temperature_level: String,
    pub interests: Option<String>,
    pub personality: Option<String>,
    pub unique_qualities: Option<String>,
    pub behavior_patterns: Option<String>,
    pub investment_profile: Option<String>,
    pub tags: Vec<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_interaction_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub owner_id: Uuid,
    // Required by validation, Option so an absent field reaches
    // build_new_client and reports 400 rather than failing extraction.
    pub name: Option<String>,
    pub phone: Option<String>,
    pub wechat: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub stage: Option<String>,
    pub temperature_score: Option<i32>,
    pub temperature_level: Option<String>,
    pub interests: Option<String>,
    pub personality: Option<String>,
    pub unique_qualities: Option<String>,
    pub behavior_patterns: Option<String>,
    pub investment_profile: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Nullable profile fields use double `Option`: absent leaves the stored
/// value alone, an explicit JSON `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub wechat: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub email: Option<Option<String>>,
    pub source: Option<String>,
    pub temperature_score: Option<i32>,
    pub temperature_level: Option<String>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub interests: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub personality: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub unique_qualities: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub behavior_patterns: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub investment_profile: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub archived: Option<bool>,
}

#[derive(AsChangeset)]
#[diesel(table_name = clients)]
struct ClientChanges {
    name: Option<String>,
    phone: Option<Option<String>>,
    wechat: Option<Option<String>>,
    email: Option<Option<String>>,
    source: Option<String>,
    temperature_score: Option<i32>,
    temperature_level: Option<String>,
    interests: Option<Option<String>>,
    personality: Option<Option<String>>,
    unique_qualities: Option<Option<String>>,
    behavior_patterns: Option<Option<String>>,
    investment_profile: Option<Option<String>>,
    tags: Option<Vec<String>>,
    archived: Option<bool>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
    pub owner_id: Uuid,
    pub search: Option<String>,
    pub stage: Option<String>,
    pub temperature_level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    pub client: Client,
    pub tags: Vec<String>,
    pub recent_logs: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ClientsResponse {
    pub clients: Vec<Client>,
}

fn validate_temperature(
    score: Option<i32>,
    level: Option<&str>,
) -> Result<(Option<i32>, Option<String>), ApiError> {
    if let Some(score) = score {
        if !(0..=100).contains(&score) {
            return Err(ApiError::Validation(format!(
                "temperature_score must be between 0 and 100, got {score}"
            )));
        }
    }
    let level = level
        .map(|l| {
            TemperatureLevel::parse(l)
                .map(|lvl| lvl.as_str().to_string())
                .ok_or_else(|| {
                    ApiError::Validation(format!("unknown temperature_level: {l}"))
                })
        })
        .transpose()?;
    Ok((score, level))
}

/// Assemble the stored record from a create request, applying the
/// new-lead / 50 / neutral defaults.
pub fn build_new_client(req: CreateClientRequest, now: DateTime<Utc>) -> Result<Client, ApiError> {
    let name = req.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let source = req.source.unwrap_or_default();
    if source.trim().is_empty() {
        return Err(ApiError::Validation("source is required".to_string()));
    }
    let stage = match req.stage.as_deref() {
        Some(s) => Stage::parse(s)
            .ok_or_else(|| ApiError::Validation(format!("unknown stage: {s}")))?,
        None => Stage::default(),
    };
    let (score, level) =
        validate_temperature(req.temperature_score, req.temperature_level.as_deref())?;

    Ok(Client {
        id: Uuid::new_v4(),
        owner_id: req.owner_id,
        name,
        phone: req.phone,
        wechat: req.wechat,
        email: req.email,
        source,
        stage: stage.as_str().to_string(),
        temperature_score: score.unwrap_or(50),
        temperature_level: level
            .unwrap_or_else(|| TemperatureLevel::default().as_str().to_string()),
        interests: req.interests,
        personality: req.personality,
        unique_qualities: req.unique_qualities,
        behavior_patterns: req.behavior_patterns,
        investment_profile: req.investment_profile,
        tags: req.tags.unwrap_or_default(),
        archived: false,
        created_at: now,
        updated_at: now,
        last_interaction_at: None,
    })
}

/// Sort for listing: stage under the configured comparator, then most
/// recently contacted first (never-contacted clients last).
pub fn sort_clients(clients: &mut [Client], order: StageOrder) {
    let position = |stage: &str| {
        Stage::parse(stage)
            .map(|s| s.pipeline_position())
            .unwrap_or(Stage::ALL.len())
    };
    clients.sort_by(|a, b| {
        let by_stage = match order {
            StageOrder::Lexical => a.stage.cmp(&b.stage),
            StageOrder::Pipeline => position(&a.stage).cmp(&position(&b.stage)),
        };
        by_stage.then_with(|| b.last_interaction_at.cmp(&a.last_interaction_at))
    });
}

/// The monotonic-touch guard: a timestamp only advances, never rewinds.
pub fn advances_last_interaction(
    stored: Option<DateTime<Utc>>,
    ts: DateTime<Utc>,
) -> bool {
    stored.map_or(true, |existing| existing <= ts)
}

/// Move `last_interaction_at` forward to `ts`, skipping the write when the
/// stored value is already later. Callers must hold the client row lock.
pub fn touch_last_interaction(
    conn: &mut PgConnection,
    client_id: Uuid,
    ts: DateTime<Utc>,
) -> QueryResult<()> {
    let stored: Option<DateTime<Utc>> = clients::table
        .find(client_id)
        .select(clients::last_interaction_at)
        .first(conn)?;

    if advances_last_interaction(stored, ts) {
        diesel::update(clients::table.find(client_id))
            .set(clients::last_interaction_at.eq(ts))
            .execute(conn)?;
    }
    Ok(())
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<IdResponse>, ApiError> {
    let client = build_new_client(req, Utc::now())?;
    let mut conn = state.conn.get()?;

    diesel::insert_into(clients::table)
        .values(&client)
        .execute(&mut conn)?;

    Ok(Json(IdResponse { id: client.id }))
}

pub async fn get_client_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    let client: Option<Client> = clients::table.find(id).first(&mut conn).optional()?;
    let client = found_or_404(client, "Client")?;

    let recent_logs = interactions::recent_entries(&mut conn, id, 50)?;
    let tags = client.tags.clone();

    Ok(Json(ClientDetail {
        client,
        tags,
        recent_logs,
    }))
}

pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(name) = req.name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name cannot be empty".to_string()));
        }
    }
    if let Some(source) = req.source.as_deref() {
        if source.trim().is_empty() {
            return Err(ApiError::Validation("source cannot be empty".to_string()));
        }
    }
    let (score, level) =
        validate_temperature(req.temperature_score, req.temperature_level.as_deref())?;

    let changes = ClientChanges {
        name: req.name,
        phone: req.phone,
        wechat: req.wechat,
        email: req.email,
        source: req.source,
        temperature_score: score,
        temperature_level: level,
        interests: req.interests,
        personality: req.personality,
        unique_qualities: req.unique_qualities,
        behavior_patterns: req.behavior_patterns,
        investment_profile: req.investment_profile,
        tags: req.tags,
        archived: req.archived,
        updated_at: Utc::now(),
    };

    let mut conn = state.conn.get()?;
    let affected = diesel::update(clients::table.find(id))
        .set(&changes)
        .execute(&mut conn)?;
    if affected == 0 {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }

    Ok(Json(serde_json::json!({})))
}

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<ClientsResponse>, ApiError> {
    let stage = query
        .stage
        .as_deref()
        .map(|s| {
            Stage::parse(s).ok_or_else(|| ApiError::Validation(format!("unknown stage: {s}")))
        })
        .transpose()?;
    let level = query
        .temperature_level
        .as_deref()
        .map(|l| {
            TemperatureLevel::parse(l)
                .ok_or_else(|| ApiError::Validation(format!("unknown temperature_level: {l}")))
        })
        .transpose()?;

    let mut conn = state.conn.get()?;

    let mut q = clients::table
        .filter(clients::owner_id.eq(query.owner_id))
        .filter(clients::archived.eq(false))
        .into_boxed();

    if let Some(stage) = stage {
        q = q.filter(clients::stage.eq(stage.as_str()));
    }
    if let Some(level) = level {
        q = q.filter(clients::temperature_level.eq(level.as_str()));
    }
    if let Some(search) = query.search.filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        q = q.filter(
            clients::name
                .ilike(pattern.clone())
                .nullable()
                .or(clients::phone.ilike(pattern.clone()))
                .or(clients::wechat.ilike(pattern)),
        );
    }

    let mut result: Vec<Client> = q.load(&mut conn)?;
    sort_clients(&mut result, state.config.pipeline.stage_order);

    Ok(Json(ClientsResponse { clients: result }))
}

pub fn configure_clients_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/:id",
            get(get_client_detail).put(update_client),
        )
}
