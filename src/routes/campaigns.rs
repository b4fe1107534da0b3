use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::campaigns;
use crate::db::models::ScannedCampaign;
use crate::error::{AppError, AppResult};
use crate::scan;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub scan: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/campaigns/{id}", get(get_campaign))
        .route("/api/campaigns/{id}/images", get(list_images))
        .route("/api/campaigns/{id}/qr", get(landing_qr))
        .route("/api/campaigns/{id}/reward-qr", get(reward_qr))
}

async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ScanQuery>,
) -> AppResult<Json<ScannedCampaign>> {
    let campaign = campaigns::get_campaign(&state.db, &id)?;
    let scan = scan::resolve(query.scan.as_deref());
    Ok(Json(ScannedCampaign { campaign, scan }))
}

async fn list_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let images = state.images.list(&id).await?;
    Ok(Json(json!({ "images": images })))
}

/// SVG QR code for the in-store landing link of a campaign.
async fn landing_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ScanQuery>,
) -> AppResult<Response> {
    if !campaigns::campaign_exists(&state.db, &id)? {
        return Err(AppError::NotFound("Campaign"));
    }

    let base = match state.config.public_base() {
        Some(base) => base.to_string(),
        None => {
            let lan_ip = local_ip_address::local_ip()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|_| "127.0.0.1".to_string());
            format!("http://{}:{}", lan_ip, state.config.server.port)
        }
    };

    let scan = scan::resolve(query.scan.as_deref());
    let link = scan::landing_url(&base, &id, &scan)
        .map_err(|e| AppError::Internal(format!("Invalid landing base {}: {}", base, e)))?;

    Ok(svg_response(render_qr(&link)?))
}

/// SVG QR code staff scan on the thank-you screen to hand out a reward.
async fn reward_qr(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    if !campaigns::campaign_exists(&state.db, &id)? {
        return Err(AppError::NotFound("Campaign"));
    }
    Ok(svg_response(render_qr(&format!("reward:{}", id))?))
}

pub fn render_qr(data: &str) -> AppResult<String> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| {
        tracing::error!("QR code generation failed: {}", e);
        AppError::Internal("QR code generation failed".into())
    })?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .max_dimensions(300, 300)
        .dark_color(svg::Color("#0a0a0a"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

fn svg_response(svg: String) -> Response {
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
}
