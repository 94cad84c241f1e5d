use crate::error::{Result, WikiDiscoverError};
use crate::wiki_select::DEFAULT_REGISTRY_TABLE;
use mysql_async as my;
use mysql_async::prelude::Queryable;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{instrument, trace};

const DEFAULT_DB_PORT: u16 = 3306;

// ---------------------------------------------------------------------------
// DatabaseManager – owns the registry connection pool and its config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DatabaseManager {
    /// Full application config; connection settings are read from here.
    config: Value,
    /// Created on first use, so that building a manager needs no runtime.
    pool: Arc<OnceLock<my::Pool>>,
}

impl DatabaseManager {
    /// Initialise from the application config JSON value.
    ///
    /// A config without registry connection settings is accepted; every
    /// attempt to get a connection then fails with a configuration error.
    pub fn new_from_config(config: &Value) -> Self {
        Self {
            config: config.to_owned(),
            pool: Arc::new(OnceLock::new()),
        }
    }

    /// Name of the registry table, `cw_wikis` unless configured otherwise.
    pub fn registry_table(&self) -> String {
        self.config["registry_table"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_REGISTRY_TABLE)
            .to_string()
    }

    fn config_str(&self, key: &str) -> Result<String> {
        self.config[key]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                WikiDiscoverError::Configuration(format!("No {key} key in config file"))
            })
    }

    fn port(&self) -> u16 {
        self.config["db_port"]
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_DB_PORT)
    }

    /// Build [`my::Opts`] for the registry database from the config.
    fn get_registry_opts(&self) -> Result<my::Opts> {
        let schema = self.config_str("registry_database")?;
        let host = self.config_str("host")?;
        let user = self.config_str("user")?;
        let password = self.config["password"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(my::OptsBuilder::default()
            .ip_or_hostname(host)
            .db_name(Some(schema))
            .user(Some(user))
            .pass(Some(password))
            .tcp_port(self.port())
            .into())
    }

    fn pool(&self) -> Result<&my::Pool> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let opts = self.get_registry_opts()?;
        Ok(self.pool.get_or_init(|| my::Pool::new(opts)))
    }

    async fn set_read_only(conn: &mut my::Conn) -> Result<()> {
        conn.query_drop("SET SESSION TRANSACTION READ ONLY").await?;
        Ok(())
    }

    /// Takes a connection to the registry database from the pool and puts
    /// its session into read-only mode. Dropping the connection returns it
    /// to the pool.
    #[instrument(skip(self), err)]
    pub async fn get_registry_db_connection(&self) -> Result<my::Conn> {
        let pool = self.pool()?;
        let mut conn = pool.get_conn().await.map_err(|e| {
            WikiDiscoverError::Configuration(format!(
                "DatabaseManager::get_registry_db_connection cannot connect to registry database: '{e}'"
            ))
        })?;
        trace!(connection_id = conn.id(), "got registry connection");
        Self::set_read_only(&mut conn).await?;
        Ok(conn)
    }

    /// Closes all idle connections. Called on shutdown.
    pub async fn disconnect(&self) -> Result<()> {
        if let Some(pool) = self.pool.get() {
            pool.clone().disconnect().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> Value {
        json!({
            "registry_database": "mhglobal",
            "host": "db.example.org",
            "user": "wikidiscover",
            "password": "secret",
            "db_port": 3307,
        })
    }

    #[test]
    fn test_registry_table_default() {
        let dm = DatabaseManager::new_from_config(&json!({}));
        assert_eq!(dm.registry_table(), "cw_wikis");

        let dm = DatabaseManager::new_from_config(&json!({"registry_table": "  "}));
        assert_eq!(dm.registry_table(), "cw_wikis");
    }

    #[test]
    fn test_registry_table_configured() {
        let dm = DatabaseManager::new_from_config(&json!({"registry_table": "wikis"}));
        assert_eq!(dm.registry_table(), "wikis");
    }

    #[test]
    fn test_registry_opts() {
        let dm = DatabaseManager::new_from_config(&full_config());
        let opts = dm.get_registry_opts().expect("complete config");
        assert_eq!(opts.ip_or_hostname(), "db.example.org");
        assert_eq!(opts.db_name(), Some("mhglobal"));
        assert_eq!(opts.user(), Some("wikidiscover"));
        assert_eq!(opts.pass(), Some("secret"));
        assert_eq!(opts.tcp_port(), 3307);
    }

    #[test]
    fn test_registry_opts_default_port() {
        let mut config = full_config();
        config["db_port"] = json!(99_999);
        let dm = DatabaseManager::new_from_config(&config);
        assert_eq!(dm.port(), 3306);
    }

    #[test]
    fn test_registry_opts_missing_keys() {
        for key in ["registry_database", "host", "user"] {
            let mut config = full_config();
            if let Some(obj) = config.as_object_mut() {
                obj.remove(key);
            }
            let dm = DatabaseManager::new_from_config(&config);
            match dm.get_registry_opts() {
                Err(WikiDiscoverError::Configuration(message)) => {
                    assert_eq!(message, format!("No {key} key in config file"));
                }
                other => panic!("expected configuration error for {key}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_connection_without_config() {
        let dm = DatabaseManager::default();
        let result = dm.get_registry_db_connection().await;
        assert!(matches!(result, Err(WikiDiscoverError::Configuration(_))));
        assert!(dm.disconnect().await.is_ok());
    }
}
