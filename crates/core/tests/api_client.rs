// API contract checks against a local stand-in for `/api/me`.
//
// The handler accepts exactly one session cookie; anything else is refused,
// which is enough to exercise cookie replay from the session artifact.

mod common;

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use common::TestServer;
use rhombus::api::{self, ApiClient};
use rhombus::config::parse_base_url;
use rhombus::{AuthenticatedSession, Cookie, Error, SessionArtifact, StorageState, SuiteConfig};
use serde_json::json;

fn has_session(headers: &HeaderMap) -> bool {
	headers
		.get(header::COOKIE)
		.and_then(|v| v.to_str().ok())
		.is_some_and(|cookies| cookies.split("; ").any(|kv| kv == "sid=good"))
}

async fn me(headers: HeaderMap) -> Response {
	if has_session(&headers) {
		axum::Json(json!({ "id": 7, "email": "qa@rhombus.test" })).into_response()
	} else {
		StatusCode::UNAUTHORIZED.into_response()
	}
}

fn app() -> Router {
	Router::new()
		.route("/api/me", get(me))
		.route("/api/null", get(|| async { axum::Json(json!(null)) }))
		.route("/api/forbidden", get(|| async { StatusCode::FORBIDDEN }))
		.route("/api/open", get(|| async { axum::Json(json!({ "public": true })) }))
}

fn config_for(server: &TestServer) -> SuiteConfig {
	SuiteConfig {
		base_url: parse_base_url(server.url()).unwrap(),
		..SuiteConfig::default()
	}
}

fn session_state(server: &TestServer, value: &str) -> StorageState {
	StorageState::with_cookies(vec![Cookie::new("sid", value, server.host()).path("/").http_only(true)])
}

#[tokio::test]
async fn authenticated_me_returns_truthy_json() {
	let server = TestServer::start(app()).await;
	let config = config_for(&server);
	let client = ApiClient::authenticated(&config, session_state(&server, "good")).unwrap();

	let body = api::check_authenticated(&client, &config.api.me).await.unwrap();
	assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn anonymous_me_is_refused() {
	let server = TestServer::start(app()).await;
	let config = config_for(&server);
	let client = ApiClient::anonymous(&config).unwrap();

	assert_eq!(api::check_unauthenticated(&client, &config.api.me).await.unwrap(), 401);
	assert_eq!(api::check_unauthenticated(&client, "/api/forbidden").await.unwrap(), 403);
}

#[tokio::test]
async fn stale_session_violates_authenticated_contract() {
	let server = TestServer::start(app()).await;
	let config = config_for(&server);
	let client = ApiClient::authenticated(&config, session_state(&server, "expired")).unwrap();

	match api::check_authenticated(&client, &config.api.me).await {
		Err(Error::ContractViolation { endpoint, detail }) => {
			assert_eq!(endpoint, "/api/me");
			assert!(detail.contains("got 401"), "{detail}");
		}
		other => panic!("expected contract violation, got {other:?}"),
	}
}

#[tokio::test]
async fn expired_cookies_are_not_replayed() {
	let server = TestServer::start(app()).await;
	let config = config_for(&server);
	let state = StorageState::with_cookies(vec![Cookie::new("sid", "good", server.host()).path("/").expires(1.0)]);
	let client = ApiClient::authenticated(&config, state).unwrap();

	let response = client.get(&config.api.me).await.unwrap();
	assert_eq!(response.status, 401);
}

#[tokio::test]
async fn falsy_body_violates_contract() {
	let server = TestServer::start(app()).await;
	let client = ApiClient::authenticated(&config_for(&server), session_state(&server, "good")).unwrap();

	let err = api::check_authenticated(&client, "/api/null").await.unwrap_err();
	assert!(err.to_string().contains("truthy"), "{err}");
}

#[tokio::test]
async fn open_endpoint_violates_unauthenticated_contract() {
	let server = TestServer::start(app()).await;
	let client = ApiClient::anonymous(&config_for(&server)).unwrap();

	let err = api::check_unauthenticated(&client, "/api/open").await.unwrap_err();
	assert!(matches!(err, Error::ContractViolation { .. }), "{err:?}");
}

#[tokio::test]
async fn session_loaded_from_artifact_authenticates() {
	let server = TestServer::start(app()).await;
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join(".auth/storageState.json");
	session_state(&server, "good").to_file(&path).unwrap();

	let config = SuiteConfig {
		storage_state_path: path.clone(),
		..config_for(&server)
	};
	let session = AuthenticatedSession::from_artifact(config, SessionArtifact::new(path)).unwrap();
	let client = session.api_client().unwrap();

	assert!(client.is_authenticated());
	api::check_authenticated(&client, &session.config().api.me).await.unwrap();
}
