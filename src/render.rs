use crate::content_type::ContentType;
use crate::error::{Result, WikiDiscoverError};
use crate::form_parameters::FormParameters;
use crate::wiki_query::QueryResult;
use hyper::StatusCode;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyResponse {
    pub s: String,
    pub content_type: ContentType,
    pub status: StatusCode,
    /// Whether the response may be stored by shared caches.
    pub cacheable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderParams {
    json_pretty: bool,
    json_callback: Option<String>,
}

impl RenderParams {
    /// Output options from `format` and `callback`. Unknown formats and
    /// unsafe callback names are rejected.
    pub fn new(form_parameters: &FormParameters) -> Result<Self> {
        lazy_static! {
            static ref CALLBACK_RE: Regex =
                Regex::new(r"^[\]\[.\w]+$").expect("CALLBACK_RE does not parse");
        }
        let json_pretty = match form_parameters.get("format") {
            None | Some("json") => false,
            Some("jsonfm") => true,
            Some(other) => {
                return Err(WikiDiscoverError::validation(
                    "format",
                    format!("Unrecognized value '{other}'"),
                ));
            }
        };
        let json_callback = match form_parameters.get("callback") {
            Some(callback) if CALLBACK_RE.is_match(callback) => Some(callback.to_string()),
            Some(_) => {
                return Err(WikiDiscoverError::validation(
                    "callback",
                    "Invalid callback name",
                ));
            }
            None => None,
        };
        Ok(Self {
            json_pretty,
            json_callback,
        })
    }

    pub const fn json_pretty(&self) -> bool {
        self.json_pretty
    }

    pub fn json_callback(&self) -> Option<&str> {
        self.json_callback.as_deref()
    }
}

/// Renders query results and errors as JSON, or JSONP if a callback was given.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderJSON;

impl RenderJSON {
    pub fn result_to_json(result: &QueryResult) -> Value {
        let query = match result {
            QueryResult::Rows(rows) => {
                let rows: Vec<Value> = rows.iter().map(|row| row.to_json()).collect();
                json!({ "wikidiscover": rows })
            }
            QueryResult::Identifiers(dbnames) => json!({ "dbnames": dbnames }),
        };
        json!({ "batchcomplete": true, "query": query })
    }

    pub fn error_to_json(error: &WikiDiscoverError) -> Value {
        json!({ "error": { "code": error.code(), "info": error.to_string() } })
    }

    pub fn response(&self, result: &QueryResult, params: &RenderParams) -> MyResponse {
        let value = Self::result_to_json(result);
        let mut ret = self.output_json(&value, params, StatusCode::OK);
        ret.cacheable = true;
        ret
    }

    pub fn error_response(&self, error: &WikiDiscoverError, params: &RenderParams) -> MyResponse {
        let value = Self::error_to_json(error);
        self.output_json(&value, params, error.status())
    }

    fn output_json(&self, value: &Value, params: &RenderParams, status: StatusCode) -> MyResponse {
        let output = if params.json_pretty() {
            ::serde_json::to_string_pretty(value)
        } else {
            ::serde_json::to_string(value)
        };
        let json_string = output
            .unwrap_or_else(|e| format!("{{\"error\":\"JSON serialization failed: {e}\"}}"));
        match params.json_callback() {
            Some(callback) => MyResponse {
                s: format!("{callback}({json_string})"),
                content_type: ContentType::JSONP,
                status,
                cacheable: false,
            },
            None => MyResponse {
                s: json_string,
                content_type: if params.json_pretty() {
                    ContentType::Plain
                } else {
                    ContentType::JSON
                },
                status,
                cacheable: false,
            },
        }
    }
}
