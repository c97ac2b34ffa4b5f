use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::UploadService;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub uploads: Arc<UploadService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;
        store.seed_sample_data().await?;

        let uploads = Arc::new(UploadService::new(&config.general.uploads_path));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            uploads,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
