use crate::database_manager::DatabaseManager;
use crate::error::Result;
use crate::form_parameters::FormParameters;
use crate::render::{MyResponse, RenderJSON, RenderParams};
use crate::wiki_query::{QueryRequest, QueryResult, WikiListQuery};
use crate::wiki_store::{MySqlWikiStore, WikiStore};
use serde_json::Value;
use tracing::warn;

const DEFAULT_CACHE_MAX_AGE: u64 = 300;

// ---------------------------------------------------------------------------
// AppState – top-level application state; delegates DB work to DatabaseManager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AppState {
    db_manager: DatabaseManager,
    cache_max_age: u64,
}

impl AppState {
    pub fn new_from_config(config: &Value) -> Self {
        Self {
            db_manager: DatabaseManager::new_from_config(config),
            cache_max_age: config["cache_max_age"]
                .as_u64()
                .unwrap_or(DEFAULT_CACHE_MAX_AGE),
        }
    }

    /// Value for the `Cache-Control` header of cacheable responses.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }

    pub fn wiki_list_query(&self) -> WikiListQuery {
        WikiListQuery::new(&self.db_manager.registry_table())
    }

    pub fn wiki_store(&self) -> MySqlWikiStore {
        MySqlWikiStore::new(self.db_manager.clone())
    }

    /// Answers a request against the configured registry database.
    pub async fn process(&self, form_parameters: &FormParameters) -> MyResponse {
        let store = self.wiki_store();
        self.process_with_store(&store, form_parameters).await
    }

    pub async fn process_with_store(
        &self,
        store: &dyn WikiStore,
        form_parameters: &FormParameters,
    ) -> MyResponse {
        let params = match RenderParams::new(form_parameters) {
            Ok(params) => params,
            Err(e) => return RenderJSON.error_response(&e, &RenderParams::default()),
        };
        match self.run_query(store, form_parameters).await {
            Ok(result) => RenderJSON.response(&result, &params),
            Err(e) => {
                warn!("{e}\n{form_parameters}");
                RenderJSON.error_response(&e, &params)
            }
        }
    }

    async fn run_query(
        &self,
        store: &dyn WikiStore,
        form_parameters: &FormParameters,
    ) -> Result<QueryResult> {
        let request = QueryRequest::new_from_parameters(form_parameters)?;
        self.wiki_list_query().execute(store, &request).await
    }

    pub async fn shut_down(&self) {
        if let Err(e) = self.db_manager.disconnect().await {
            warn!("Could not disconnect registry pool: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentType;
    use crate::wiki_query::WikiRecord;
    use crate::wiki_store::MemoryWikiStore;
    use hyper::StatusCode;

    fn store() -> MemoryWikiStore {
        let record = |dbname: &str, closed: bool, private: bool| WikiRecord {
            dbname: dbname.to_string(),
            url: format!("https://{dbname}.example.org"),
            sitename: dbname.to_uppercase(),
            languagecode: "en".to_string(),
            closed,
            private,
            ..Default::default()
        };
        MemoryWikiStore::new(vec![
            record("alphawiki", true, false),
            record("betawiki", false, false),
            record("gammawiki", false, true),
        ])
    }

    async fn body_for(query: &str) -> (MyResponse, Value) {
        let state = AppState::new_from_config(&json!({}));
        let fp = FormParameters::outcome_from_query(query);
        let response = state.process_with_store(&store(), &fp).await;
        let value = serde_json::from_str(&response.s).expect("response is JSON");
        (response, value)
    }

    #[test]
    fn test_cache_control() {
        let state = AppState::new_from_config(&json!({}));
        assert_eq!(state.cache_control(), "public, max-age=300");
        let state = AppState::new_from_config(&json!({"cache_max_age": 60}));
        assert_eq!(state.cache_control(), "public, max-age=60");
    }

    #[test]
    fn test_wiki_list_query_table() {
        let state = AppState::new_from_config(&json!({"registry_table": "wikis"}));
        assert_eq!(state.wiki_list_query().table(), "wikis");
        assert_eq!(AppState::default().wiki_list_query().table(), "cw_wikis");
    }

    #[tokio::test]
    async fn test_process_direct() {
        let (response, value) =
            body_for("action=wikidiscover&state=public&siteprop=sitename").await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.cacheable);
        assert_eq!(
            value["query"]["wikidiscover"],
            json!([
                {"dbname": "alphawiki", "sitename": "ALPHAWIKI"},
                {"dbname": "betawiki", "sitename": "BETAWIKI"}
            ])
        );
    }

    #[tokio::test]
    async fn test_process_generator() {
        let (_, value) = body_for("action=query&generator=wikidiscover&state=closed").await;
        assert_eq!(value["query"]["dbnames"], json!(["alphawiki"]));
    }

    #[tokio::test]
    async fn test_process_contradiction_is_empty_not_error() {
        let (response, value) = body_for("state=private|public").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(value["query"]["wikidiscover"], json!([]));
    }

    #[tokio::test]
    async fn test_process_validation_error() {
        let (response, value) = body_for("state=archived").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(!response.cacheable);
        assert_eq!(value["error"]["code"], "badvalue");
    }

    #[tokio::test]
    async fn test_process_bad_format_is_plain_json_error() {
        let (response, value) = body_for("format=xml").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.content_type, ContentType::JSON);
        assert!(value["error"]["info"].as_str().unwrap_or_default().contains("format"));
    }

    #[tokio::test]
    async fn test_process_unconfigured_database() {
        let state = AppState::new_from_config(&json!({}));
        let fp = FormParameters::outcome_from_query("action=wikidiscover");
        let response = state.process(&fp).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.s.contains("\"config\""));
    }
}
