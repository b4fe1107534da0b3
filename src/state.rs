use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::images::ImageStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let images = ImageStore::new(config.campaigns_path(), config.public_base());
        Self { db, config, images }
    }
}
