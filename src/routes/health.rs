use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::IpAddr;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LanAddress {
    pub iface: String,
    pub address: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/lan", get(lan))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Non-loopback IPv4 addresses, so a QR code can point phones on the same network here.
async fn lan() -> AppResult<Json<Value>> {
    let interfaces = local_ip_address::list_afinet_netifas().map_err(|e| {
        tracing::error!("Listing network interfaces failed: {}", e);
        AppError::Internal("Listing network interfaces failed".into())
    })?;

    Ok(Json(json!({ "ipv4": external_ipv4(interfaces) })))
}

fn external_ipv4(interfaces: Vec<(String, IpAddr)>) -> Vec<LanAddress> {
    interfaces
        .into_iter()
        .filter_map(|(iface, ip)| match ip {
            IpAddr::V4(v4) if !v4.is_loopback() => Some(LanAddress {
                iface,
                address: v4.to_string(),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_ipv4_skips_loopback_and_v6() {
        let interfaces = vec![
            ("lo".to_string(), "127.0.0.1".parse().unwrap()),
            ("en0".to_string(), "192.168.1.20".parse().unwrap()),
            ("en0".to_string(), "fe80::1".parse().unwrap()),
        ];
        let lan = external_ipv4(interfaces);
        assert_eq!(lan.len(), 1);
        assert_eq!(lan[0].iface, "en0");
        assert_eq!(lan[0].address, "192.168.1.20");
    }
}
