use crate::api::api_error::APIError;
use crate::api::model::LookupResult;
use crate::api::server::AppState;
use crate::error::Error;
use axum::extract::{ConnectInfo, Host, State};
use axum::http::{header, HeaderMap, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use trust_dns_server::client::rr::{LowerName, Name};

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/healthcheck", get(health_check))
        .route("/json", get(lookup))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn liveness() -> &'static str {
    "up"
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn lookup(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    host: Option<Host>,
    headers: HeaderMap,
) -> Result<Json<LookupResult>, APIError> {
    let hostname = match host {
        Some(Host(host)) => hostname(&host)?,
        None => return Err(Error::HostMissing.into()),
    };

    let record = state
        .visitor_store
        .lookup(&LowerName::from(&hostname))
        .await
        .ok_or_else(|| Error::NotFound(hostname.clone()))?;

    let requester_ip = forwarded_for(&headers).unwrap_or_else(|| client_addr.ip().to_string());
    let known = state.config.all_known(&record.ips);
    tracing::debug!("lookup of \"{hostname}\" from {requester_ip}: {:?}", record.ips);
    Ok(Json(LookupResult::new(&record, known, requester_ip)))
}

/// Turn a `Host` header value into a fully qualified name, dropping any port.
fn hostname(host: &str) -> Result<Name, Error> {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    };
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        return Err(Error::HostMissing);
    }
    Name::from_ascii(format!("{host}.")).map_err(|_| Error::InvalidHost(host.to_string()))
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::visitor_store::{DynVisitorStore, InMemoryVisitorStore};
    use axum::http::{HeaderValue, StatusCode};
    use std::str::FromStr;
    use std::sync::Arc;

    async fn state_with(hosts: &[(&str, &str)]) -> AppState {
        let mut config = test_config();
        config.known_resolvers = vec!["192.0.2.0/24".parse().unwrap()];
        let visitor_store: DynVisitorStore = Arc::new(InMemoryVisitorStore::new());
        for (host, ip) in hosts {
            visitor_store
                .record_sighting(&Name::from_str(host).unwrap(), ip.parse().unwrap())
                .await;
        }
        AppState {
            config: Arc::new(config),
            visitor_store,
        }
    }

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo("203.0.113.9:51000".parse().unwrap())
    }

    fn status_of(result: Result<Json<LookupResult>, APIError>) -> StatusCode {
        match result {
            Ok(_) => StatusCode::OK,
            Err(err) => err.into_response().status(),
        }
    }

    #[tokio::test]
    async fn root_reports_up() {
        assert_eq!(liveness().await, "up");
    }

    #[test]
    fn hostname_normalization() {
        for (host, expected) in [
            ("sub.example.com", "sub.example.com."),
            ("sub.example.com:8080", "sub.example.com."),
            ("sub.example.com.", "sub.example.com."),
            ("Sub.Example.com", "Sub.Example.com."),
        ] {
            assert_eq!(hostname(host).unwrap().to_string(), expected, "{host}");
        }
        assert!(matches!(hostname(""), Err(Error::HostMissing)));
        assert!(matches!(hostname(":80"), Err(Error::HostMissing)));
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_for(&headers), None);
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 198.51.100.7 , 10.0.0.1"),
        );
        assert_eq!(forwarded_for(&headers), Some("198.51.100.7".to_string()));
    }

    #[tokio::test]
    async fn lookup_found() {
        let state = state_with(&[
            ("sub.example.com.", "192.0.2.53"),
            ("sub.example.com.", "192.0.2.54"),
        ])
        .await;

        let result = lookup(
            State(state),
            peer(),
            Some(Host("SUB.example.com:80".to_string())),
            HeaderMap::new(),
        )
        .await;

        let Ok(Json(result)) = result else {
            panic!("expected a lookup result");
        };
        assert_eq!(
            result,
            LookupResult {
                domain: "sub.example.com.".to_string(),
                ips: vec!["192.0.2.53".to_string(), "192.0.2.54".to_string()],
                known: true,
                requester_ip: "203.0.113.9".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn lookup_unknown_resolver_and_forwarded_requester() {
        let state = state_with(&[
            ("sub.example.com.", "192.0.2.53"),
            ("sub.example.com.", "8.8.8.8"),
        ])
        .await;
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7"));

        let result = lookup(
            State(state),
            peer(),
            Some(Host("sub.example.com".to_string())),
            headers,
        )
        .await;

        let Ok(Json(result)) = result else {
            panic!("expected a lookup result");
        };
        assert!(!result.known);
        assert_eq!(result.requester_ip, "198.51.100.7");
    }

    #[tokio::test]
    async fn lookup_not_found() {
        let state = state_with(&[]).await;
        let result = lookup(
            State(state),
            peer(),
            Some(Host("missing.example.com".to_string())),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(status_of(result), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lookup_without_host() {
        let state = state_with(&[]).await;
        let result = lookup(State(state), peer(), None, HeaderMap::new()).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn result_serializes_requester_ip_key() {
        let value = serde_json::to_value(LookupResult {
            domain: "sub.example.com.".to_string(),
            ips: vec!["192.0.2.53".to_string()],
            known: false,
            requester_ip: "198.51.100.7".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "domain": "sub.example.com.",
                "ips": ["192.0.2.53"],
                "known": false,
                "requesterIP": "198.51.100.7",
            })
        );
    }
}
