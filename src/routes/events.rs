use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::events::{self, EventPayload, NewEvent, DEFAULT_LIST_LIMIT};
use crate::extractors::RequestContext;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(list_events).post(create_event))
}

async fn create_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<EventPayload>,
) -> AppResult<Json<Value>> {
    let event = NewEvent::from_payload(payload, ctx.ip, ctx.user_agent)?;
    let recorded = events::record_event(&state.db, event)?;
    Ok(Json(json!({ "ok": true, "id": recorded.id })))
}

async fn list_events(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let events = events::list_events(&state.db, DEFAULT_LIST_LIMIT)?;
    Ok(Json(json!({ "count": events.len(), "events": events })))
}
