use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    busy_timeout_ms: u64,
    journal_mode: &'static str,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let busy_timeout_ms = std::env::var("DATABASE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5000);
        let journal_mode = normalize_journal_mode(
            &std::env::var("DATABASE_JOURNAL_MODE").unwrap_or_else(|_| "WAL".to_string()),
        );

        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            let token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), token).build().await?,
            }
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            busy_timeout_ms,
            journal_mode,
        };
        database.configure().await;

        let conn = database.connect()?;
        schema::init_schema(&conn).await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// Pragmas are advisory; remote databases reject some of them.
    async fn configure(&self) {
        let Ok(conn) = self.connect() else {
            return;
        };

        let pragmas = [
            format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
            format!("PRAGMA journal_mode = {}", self.journal_mode),
        ];
        for pragma in pragmas {
            if let Err(error) = conn.execute_batch(&pragma).await {
                tracing::warn!(pragma = %pragma, error = %error, "Failed to apply SQLite pragma");
            }
        }
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "MEMORY" => "MEMORY",
        _ => "WAL",
    }
}
