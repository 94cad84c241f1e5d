use crate::database_manager::DatabaseManager;
use crate::error::Result;
use crate::wiki_query::WikiRow;
use crate::wiki_select::WikiSelect;
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use tracing::warn;

/// Read access to the wiki registry.
#[async_trait]
pub trait WikiStore: Send + Sync {
    /// Runs `select` and returns at most `select.limit()` rows, in storage order.
    async fn select(&self, select: &WikiSelect) -> Result<Vec<WikiRow>>;
}

/// The registry table on the configured MySQL/MariaDB server.
#[derive(Debug, Clone)]
pub struct MySqlWikiStore {
    db_manager: DatabaseManager,
}

impl MySqlWikiStore {
    pub const fn new(db_manager: DatabaseManager) -> Self {
        Self { db_manager }
    }
}

#[async_trait]
impl WikiStore for MySqlWikiStore {
    async fn select(&self, select: &WikiSelect) -> Result<Vec<WikiRow>> {
        let sql = select.to_sql();
        // Returned to the pool when dropped, on every path out of here
        let mut conn = self.db_manager.get_registry_db_connection().await?;
        let rows = conn
            .exec_iter(sql.0.as_str(), mysql_async::Params::Positional(sql.1))
            .await?
            .map_and_drop(|row| select.row_from_mysql(&row))
            .await?;
        let total = rows.len();
        let ret: Vec<WikiRow> = rows.into_iter().flatten().collect();
        if ret.len() != total {
            warn!(
                skipped = total - ret.len(),
                "registry rows without a dbname were skipped"
            );
        }
        Ok(ret)
    }
}

/// Registry kept in memory, filtered with the same semantics as the SQL.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryWikiStore {
    records: Vec<crate::wiki_query::WikiRecord>,
}

#[cfg(test)]
impl MemoryWikiStore {
    pub const fn new(records: Vec<crate::wiki_query::WikiRecord>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
#[async_trait]
impl WikiStore for MemoryWikiStore {
    async fn select(&self, select: &WikiSelect) -> Result<Vec<WikiRow>> {
        Ok(self
            .records
            .iter()
            .filter(|record| select.matches(record))
            .take(select.limit())
            .map(|record| select.project(record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WikiDiscoverError;
    use crate::wiki_query::WikiRecord;
    use crate::wiki_select::WikiFlag;

    #[tokio::test]
    async fn test_memory_store_limit_and_filter() {
        let records = (0..10)
            .map(|i| WikiRecord {
                dbname: format!("wiki{i}"),
                deleted: i % 2 == 0,
                ..Default::default()
            })
            .collect();
        let store = MemoryWikiStore::new(records);
        let mut select = WikiSelect::new("cw_wikis");
        select.add_where_flag(WikiFlag::Deleted, true);
        select.set_limit(3);
        let rows = store.select(&select).await.expect("memory select");
        let dbnames: Vec<&str> = rows.iter().map(|r| r.dbname.as_str()).collect();
        assert_eq!(dbnames, vec!["wiki0", "wiki2", "wiki4"]);
    }

    #[tokio::test]
    async fn test_mysql_store_unconfigured() {
        let db_manager = DatabaseManager::new_from_config(&json!({}));
        let store = MySqlWikiStore::new(db_manager);
        let select = WikiSelect::new("cw_wikis");
        match store.select(&select).await {
            Err(WikiDiscoverError::Configuration(message)) => {
                assert!(message.contains("registry_database"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }
}
