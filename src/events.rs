use chrono::{SecondsFormat, Utc};
use rusqlite::params;
use serde::Deserialize;

use crate::db::models::{Event, EventType};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Body of `POST /api/events`. Every field is optional on the wire so that a
/// missing `type` or `campaignId` surfaces as our own validation error.
#[derive(Debug, Default, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub app: Option<String>,
    #[serde(rename = "campaignId")]
    pub campaign_id: Option<String>,
    pub scan: Option<String>,
    pub meta: Option<serde_json::Value>,
}

/// A validated event ready to persist.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub campaign_id: String,
    pub app: Option<String>,
    pub scan: Option<String>,
    pub meta: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewEvent {
    pub fn from_payload(
        payload: EventPayload,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> AppResult<Self> {
        let event_type = required(payload.event_type)
            .ok_or_else(|| AppError::BadRequest("Missing required fields: type".into()))?;
        let campaign_id = required(payload.campaign_id)
            .ok_or_else(|| AppError::BadRequest("Missing required fields: campaignId".into()))?;

        Ok(Self {
            event_type: EventType::from(event_type),
            campaign_id,
            app: non_empty(payload.app),
            scan: non_empty(payload.scan),
            meta: match payload.meta {
                None | Some(serde_json::Value::Null) => serde_json::json!({}),
                Some(meta) => meta,
            },
            ip,
            user_agent,
        })
    }
}

/// Present and not blank. The value is kept exactly as sent.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Append an event, assigning a fresh id and server timestamp.
pub fn record_event(db: &DbPool, event: NewEvent) -> AppResult<Event> {
    let id = uuid::Uuid::now_v7().to_string();
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let meta = serde_json::to_string(&event.meta)?;

    let conn = db.get()?;
    conn.execute(
        "INSERT INTO events (id, type, app, campaign_id, scan, meta, ip, user_agent, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            event.event_type.as_str(),
            event.app,
            event.campaign_id,
            event.scan,
            meta,
            event.ip,
            event.user_agent,
            created_at
        ],
    )?;

    tracing::debug!(
        event_id = %id,
        event_type = %event.event_type,
        campaign = %event.campaign_id,
        "Recorded event"
    );

    Ok(Event {
        id,
        event_type: event.event_type,
        app: event.app,
        campaign_id: event.campaign_id,
        scan: event.scan,
        meta: event.meta,
        ip: event.ip,
        user_agent: event.user_agent,
        created_at,
    })
}

/// Most recent events, newest first.
pub fn list_events(db: &DbPool, limit: u32) -> AppResult<Vec<Event>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, type, app, campaign_id, scan, meta, ip, user_agent, created_at
         FROM events
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(
            |(id, event_type, app, campaign_id, scan, meta, ip, user_agent, created_at)| {
                Ok(Event {
                    id,
                    event_type: EventType::from(event_type),
                    app,
                    campaign_id,
                    scan,
                    meta: serde_json::from_str(&meta)?,
                    ip,
                    user_agent,
                    created_at,
                })
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_pool() -> DbPool {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        pool
    }

    fn payload(event_type: Option<&str>, campaign_id: Option<&str>) -> EventPayload {
        EventPayload {
            event_type: event_type.map(String::from),
            campaign_id: campaign_id.map(String::from),
            ..Default::default()
        }
    }

    fn event_count(pool: &DbPool) -> i64 {
        pool.get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn missing_type_or_campaign_is_rejected() {
        for p in [
            payload(None, Some("demo")),
            payload(Some("share_clicked"), None),
            payload(Some("  "), Some("demo")),
            payload(Some("share_clicked"), Some("")),
        ] {
            let err = NewEvent::from_payload(p, None, None).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }

    #[test]
    fn required_fields_are_stored_as_sent() {
        let event = NewEvent::from_payload(payload(Some("share_clicked"), Some(" demo")), None, None)
            .unwrap();
        assert_eq!(event.campaign_id, " demo");
        assert_eq!(event.event_type, EventType::ShareClicked);
    }

    #[test]
    fn meta_defaults_to_empty_object() {
        let event = NewEvent::from_payload(payload(Some("share_completed"), Some("demo")), None, None)
            .unwrap();
        assert_eq!(event.meta, serde_json::json!({}));
    }

    #[test]
    fn record_assigns_unique_ids_and_keeps_context() {
        let pool = test_pool();
        let first = record_event(
            &pool,
            NewEvent::from_payload(
                EventPayload {
                    event_type: Some("share_clicked".into()),
                    app: Some("whatsapp".into()),
                    campaign_id: Some("demo".into()),
                    scan: Some("scan-1".into()),
                    meta: None,
                },
                Some("10.0.0.5".into()),
                Some("test-agent".into()),
            )
            .unwrap(),
        )
        .unwrap();
        let second = record_event(
            &pool,
            NewEvent::from_payload(payload(Some("share_clicked"), Some("demo")), None, None).unwrap(),
        )
        .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.event_type, EventType::ShareClicked);
        assert_eq!(first.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(event_count(&pool), 2);
    }

    #[test]
    fn list_returns_newest_first_and_respects_limit() {
        let pool = test_pool();
        for kind in ["share_clicked", "caption_copied", "share_completed"] {
            record_event(
                &pool,
                NewEvent::from_payload(payload(Some(kind), Some("demo")), None, None).unwrap(),
            )
            .unwrap();
        }

        let events = list_events(&pool, DEFAULT_LIST_LIMIT).unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, ["share_completed", "caption_copied", "share_clicked"]);

        let limited = list_events(&pool, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].event_type, EventType::ShareCompleted);
    }

    #[test]
    fn download_meta_survives_storage() {
        let pool = test_pool();
        let meta = serde_json::json!({ "count": 2, "images": ["img1", "img3"] });
        record_event(
            &pool,
            NewEvent::from_payload(
                EventPayload {
                    event_type: Some("images_downloaded".into()),
                    campaign_id: Some("demo".into()),
                    meta: Some(meta.clone()),
                    ..Default::default()
                },
                None,
                None,
            )
            .unwrap(),
        )
        .unwrap();

        let events = list_events(&pool, 10).unwrap();
        assert_eq!(events[0].meta, meta);
    }
}
