//! Combines the per-module routers into the unified REST surface.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::clients::configure_clients_routes())
        .merge(crate::pipeline::configure_pipeline_routes())
        .merge(crate::interactions::configure_interactions_routes())
        .merge(crate::reports::configure_reports_routes())
}
