use rhombus::api::{self, ApiClient};
use rhombus::config::load_dotenv;
use rhombus::{AuthenticatedSession, SuiteConfig};

#[tokio::test]
#[ignore = "needs RHOMBUS_EMAIL, RHOMBUS_PASSWORD, and Chromium"]
async fn me_returns_profile_for_authenticated_session() {
	let session = AuthenticatedSession::shared().await.expect("session bootstrap");
	assert!(session.artifact().exists(), "artifact missing at {}", session.artifact().path().display());

	let client = session.api_client().unwrap();
	let body = api::check_authenticated(&client, &session.config().api.me).await.unwrap();
	assert!(api::is_truthy(&body));
}

#[tokio::test]
#[ignore = "hits the live app"]
async fn me_rejects_anonymous_requests() {
	load_dotenv();
	let config = SuiteConfig::from_env().unwrap();
	let client = ApiClient::anonymous(&config).unwrap();

	let status = api::check_unauthenticated(&client, &config.api.me).await.unwrap();
	assert!(matches!(status, 401 | 403));
}
