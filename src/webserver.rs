use crate::app_state::AppState;
use crate::form_parameters::FormParameters;
use crate::render::MyResponse;
use anyhow::Result;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, header};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const MAX_POST_SIZE: u64 = 1024 * 1024; // 1 MB
static NOTFOUND: &[u8] = b"Not Found";
static BODY_TOO_BIG: &[u8] = b"POST body too large";
static USAGE: &str = "wikidiscover: list wikis from the registry\n\n\
    ?action=wikidiscover\n\
    \x20 &state=all|closed|inactive|active|private|public|deleted  (default: all)\n\
    \x20 &siteprop=url|dbname|sitename|languagecode               (default: all four)\n\
    \x20 &limit=1..5000|max                                       (default: 5000)\n\
    \x20 &wikislist=dbname1,dbname2,...\n\
    \x20 &format=json|jsonfm  &callback=name\n\n\
    ?action=query&generator=wikidiscover returns only the matching dbnames.\n";

#[derive(Debug, Clone, Default)]
pub struct WebServer {
    app_state: Arc<AppState>,
    config: Arc<Value>,
}

impl WebServer {
    pub fn new(app_state: Arc<AppState>, config: Value) -> Self {
        WebServer {
            app_state,
            config: Arc::new(config),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let listener = self.start_webserver().await?;

        loop {
            let (stream, _) = match listener.accept().await {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("web_server: Cannot accept request: {e}");
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let me = self.clone();

            // One task per connection
            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service_fn(|req| me.process_request(req)))
                    .await
                {
                    tracing::error!("Error serving connection: {err}");
                }
            });
        }
    }

    fn listen_address(&self) -> Result<SocketAddr> {
        use anyhow::Context;
        let port = self.config["http_port"]
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(80);
        let ip_address = self.config["http_server"]
            .as_str()
            .unwrap_or("0.0.0.0")
            .to_string();
        let ip_address: std::net::IpAddr = ip_address
            .parse()
            .with_context(|| format!("Invalid http_server IP address: '{ip_address}'"))?;
        Ok(SocketAddr::from((ip_address, port)))
    }

    async fn start_webserver(&self) -> Result<TcpListener> {
        use anyhow::Context;
        let addr = self.listen_address()?;
        tracing::info!("Listening on http://{addr}");
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("web_server: Cannot bind to {addr}"))
    }

    async fn process_request(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let path = req.uri().path().to_string();

        // URL GET query
        if let Some(query) = req.uri().query()
            && !query.is_empty()
        {
            return Ok(self.process_from_query(query).await);
        }

        // POST
        if req.method() == Method::POST {
            let upper = req.body().size_hint().upper().unwrap_or(u64::MAX);
            if upper > MAX_POST_SIZE {
                return Ok(Self::simple_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    BODY_TOO_BIG,
                ));
            }
            let collected = match req.collect().await {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to read POST body: {e}");
                    return Ok(Self::simple_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        b"Internal Server Error",
                    ));
                }
            };
            let query = collected.to_bytes();
            if !query.is_empty() {
                let query = String::from_utf8_lossy(&query);
                return Ok(self.process_from_query(&query).await);
            }
        }

        match path.as_str() {
            "/" => Ok(Self::simple_response(StatusCode::OK, USAGE.as_bytes())),
            _ => Ok(Self::simple_response(StatusCode::NOT_FOUND, NOTFOUND)),
        }
    }

    async fn process_from_query(&self, query: &str) -> Response<Full<Bytes>> {
        let form_parameters = FormParameters::outcome_from_query(query);
        let ret = self.app_state.process(&form_parameters).await;
        self.build_response(ret)
    }

    fn build_response(&self, ret: MyResponse) -> Response<Full<Bytes>> {
        let mut builder = Response::builder()
            .status(ret.status)
            .header(header::CONTENT_TYPE, ret.content_type.as_str())
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
        builder = if ret.cacheable {
            builder.header(header::CACHE_CONTROL, self.app_state.cache_control())
        } else {
            builder.header(header::CACHE_CONTROL, "private, no-cache")
        };
        builder.body(Full::from(ret.s)).unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP response: {e}");
            Self::simple_response(StatusCode::INTERNAL_SERVER_ERROR, b"Internal Server Error")
        })
    }

    fn simple_response(status: StatusCode, body: &'static [u8]) -> Response<Full<Bytes>> {
        let mut resp = Response::new(Full::from(body));
        *resp.status_mut() = status;
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentType;

    fn server(config: Value) -> WebServer {
        WebServer::new(Arc::new(AppState::new_from_config(&config)), config)
    }

    #[test]
    fn test_listen_address() {
        let ws = server(json!({"http_server": "127.0.0.1", "http_port": 8000}));
        assert_eq!(
            ws.listen_address().expect("valid address").to_string(),
            "127.0.0.1:8000"
        );
        let ws = server(json!({}));
        assert_eq!(
            ws.listen_address().expect("valid address").to_string(),
            "0.0.0.0:80"
        );
        let ws = server(json!({"http_server": "not-an-ip"}));
        assert!(ws.listen_address().is_err());
    }

    #[test]
    fn test_build_response_cacheable() {
        let ws = server(json!({"cache_max_age": 120}));
        let resp = ws.build_response(MyResponse {
            s: "{}".to_string(),
            content_type: ContentType::JSON,
            status: StatusCode::OK,
            cacheable: true,
        });
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CACHE_CONTROL],
            "public, max-age=120"
        );
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn test_build_response_error_not_cached() {
        let ws = server(json!({}));
        let resp = ws.build_response(MyResponse {
            s: "{}".to_string(),
            content_type: ContentType::JSON,
            status: StatusCode::BAD_REQUEST,
            cacheable: false,
        });
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "private, no-cache");
    }

    #[tokio::test]
    async fn test_process_from_query_validation() {
        let ws = server(json!({}));
        let resp = ws.process_from_query("action=wikidiscover&limit=abc").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = resp
            .into_body()
            .collect()
            .await
            .expect("full body")
            .to_bytes();
        let value: Value = serde_json::from_slice(&body).expect("JSON body");
        assert_eq!(value["error"]["code"], "badvalue");
    }
}
