use rusqlite::{params, OptionalExtension};

use crate::db::models::{Campaign, DEFAULT_CAPTION, DEFAULT_SHARE_TARGETS};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub const DEMO_CAMPAIGN_ID: &str = "demo";

/// Look up a campaign by exact id.
pub fn get_campaign(db: &DbPool, id: &str) -> AppResult<Campaign> {
    let conn = db.get()?;

    let row = conn
        .query_row(
            "SELECT id, name, caption, image_url, share FROM campaigns WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let (id, name, caption, image_url, share) = row.ok_or(AppError::NotFound("Campaign"))?;

    Ok(Campaign {
        id,
        name,
        caption,
        image_url,
        images: Vec::new(),
        share: serde_json::from_str(&share)?,
    })
}

pub fn campaign_exists(db: &DbPool, id: &str) -> AppResult<bool> {
    let conn = db.get()?;
    let exists = conn.query_row(
        "SELECT COUNT(*) > 0 FROM campaigns WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Ensure the baseline demo campaign exists. Never overwrites an existing record.
/// Returns whether the record was inserted.
pub fn upsert_seed(db: &DbPool) -> AppResult<bool> {
    if campaign_exists(db, DEMO_CAMPAIGN_ID)? {
        return Ok(false);
    }

    tracing::info!("Seeding demo campaign");
    insert_if_absent(
        db,
        &Campaign {
            id: DEMO_CAMPAIGN_ID.to_string(),
            name: "Demo Campaign".to_string(),
            caption: DEFAULT_CAPTION.to_string(),
            image_url: "https://picsum.photos/seed/demo/1080/1350".to_string(),
            images: Vec::new(),
            share: default_share_targets(),
        },
    )
}

/// Create a default record for a campaign first seen through an admin upload.
pub fn ensure_campaign(db: &DbPool, id: &str) -> AppResult<bool> {
    let inserted = insert_if_absent(
        db,
        &Campaign {
            id: id.to_string(),
            name: id.to_string(),
            caption: DEFAULT_CAPTION.to_string(),
            image_url: String::new(),
            images: Vec::new(),
            share: default_share_targets(),
        },
    )?;
    if inserted {
        tracing::info!(campaign = id, "Created campaign from upload");
    }
    Ok(inserted)
}

fn insert_if_absent(db: &DbPool, campaign: &Campaign) -> AppResult<bool> {
    let conn = db.get()?;
    let share = serde_json::to_string(&campaign.share)?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO campaigns (id, name, caption, image_url, share)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            campaign.id,
            campaign.name,
            campaign.caption,
            campaign.image_url,
            share
        ],
    )?;
    Ok(changed > 0)
}

fn default_share_targets() -> Vec<String> {
    DEFAULT_SHARE_TARGETS.iter().map(|s| s.to_string()).collect()
}
