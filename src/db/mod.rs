use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use std::time::Duration;

use crate::{
    config::{Config, MongoSettings},
    errors::AppResult,
};

/// Handle on the course database. Cheap to clone; every repository keeps one
/// collection from it.
#[derive(Clone)]
pub struct Database {
    inner: mongodb::Database,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut options = ClientOptions::parse(&config.mongo_conn_string).await?;
        apply_pool_settings(&mut options, &config.mongo);

        log::info!(
            "Connecting to MongoDB database {} (pool {}..{}, timeout {}s)",
            config.mongo_db_name,
            config.mongo.min_pool_size,
            config.mongo.max_pool_size,
            config.mongo.connect_timeout_secs
        );

        let client = Client::with_options(options)?;
        let db = Self {
            inner: client.database(&config.mongo_db_name),
        };
        db.health_check().await?;

        log::info!("Connected to MongoDB database {}", config.mongo_db_name);
        Ok(db)
    }

    pub fn get_collection<T>(&self, collection_name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.inner.collection(collection_name)
    }

    /// Pings through the course database so readiness reflects its access,
    /// not just the cluster's.
    pub async fn health_check(&self) -> AppResult<()> {
        self.inner.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

fn apply_pool_settings(options: &mut ClientOptions, settings: &MongoSettings) {
    let timeout = Duration::from_secs(settings.connect_timeout_secs.max(1));

    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    options.max_pool_size = Some(settings.max_pool_size.max(1));
    options.min_pool_size = Some(settings.min_pool_size.min(settings.max_pool_size));
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    options.app_name = Some("coursecert-server".to_string());
}
