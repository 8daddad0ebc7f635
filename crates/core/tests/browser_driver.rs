// Browser driver tests against a local page.
//
// Launches a real Chromium; run with `-- --ignored` on a machine that has one
// (set RHOMBUS_CHROME to pick a specific binary).

mod common;

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use common::TestServer;
use rhombus::{Browser, BrowserOptions, BrowserSettings, Page, TextMatcher, WaitState, WaitUntil};

const WAIT: Duration = Duration::from_secs(5);

const APP: &str = r#"<!doctype html>
<html>
<body>
	<button onclick="document.getElementById('login').hidden = false">Log In</button>
	<form id="login" hidden onsubmit="event.preventDefault();
		document.cookie = 'sid=good; path=/';
		localStorage.setItem('token', 't-1');
		document.getElementById('status').textContent = 'signed in ' + document.getElementById('email').value;">
		<label for="email">Email address</label>
		<input id="email" type="email">
		<input type="password">
		<button type="submit">Sign in</button>
	</form>
	<input id="file" type="file" style="display: none"
		onchange="document.getElementById('status').textContent = 'file ' + this.files[0].name">
	<textarea placeholder="What would you like to do?"
		onkeydown="if (event.key === 'Enter') document.getElementById('status').textContent = 'prompt ' + this.value"></textarea>
	<p id="status"></p>
</body>
</html>"#;

fn fixture() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/messy-input.csv")
}

async fn launch() -> Browser {
	Browser::launch(BrowserOptions {
		settings: BrowserSettings {
			no_sandbox: true,
			..BrowserSettings::default()
		},
		..BrowserOptions::default()
	})
	.await
	.expect("launch Chromium")
}

async fn wait_for_status(page: &Page, expected: &str) {
	let deadline = tokio::time::Instant::now() + WAIT;
	loop {
		let status = page
			.evaluate_json("document.getElementById('status').textContent")
			.await
			.unwrap();
		if status == expected {
			return;
		}
		assert!(tokio::time::Instant::now() < deadline, "status stuck at {status}, wanted {expected}");
		tokio::time::sleep(Duration::from_millis(50)).await;
	}
}

#[tokio::test]
#[ignore = "needs Chromium"]
async fn drives_login_upload_and_prompt() {
	let server = TestServer::start(Router::new().route("/", get(|| async { Html(APP) }))).await;
	let browser = launch().await;
	let context = browser.new_context(None).await.unwrap();
	let page = context.new_page().await.unwrap();
	page.goto(server.url(), WaitUntil::DomContentLoaded).await.unwrap();

	let sign_in = page.get_by_role("button", Some(TextMatcher::regex_ignore_case("sign in")));
	assert!(!sign_in.is_visible().await.unwrap());

	page.get_by_role("button", Some(TextMatcher::exact("Log In")))
		.click(WAIT)
		.await
		.unwrap();
	page.get_by_label(TextMatcher::regex_ignore_case("email")).fill("qa@rhombus.test", WAIT).await.unwrap();
	page.locator(r#"input[type="password"]"#).first().fill("s3cret", WAIT).await.unwrap();
	sign_in.click(WAIT).await.unwrap();
	wait_for_status(&page, "signed in qa@rhombus.test").await;

	let file = page.locator(r#"input[type="file"]"#).first();
	file.wait_for(WaitState::Attached, WAIT).await.unwrap();
	assert!(!file.is_visible().await.unwrap());
	file.set_input_files(&[fixture()], WAIT).await.unwrap();
	wait_for_status(&page, "file messy-input.csv").await;

	let prompt = page
		.get_by_role("textbox", Some(TextMatcher::regex_ignore_case("what would you like to")))
		.first();
	prompt.fill("dedupe please", WAIT).await.unwrap();
	prompt.press("Enter", WAIT).await.unwrap();
	wait_for_status(&page, "prompt dedupe please").await;

	browser.close().await.unwrap();
}

#[tokio::test]
#[ignore = "needs Chromium"]
async fn storage_state_round_trips_into_a_new_context() {
	let server = TestServer::start(Router::new().route("/", get(|| async { Html(APP) }))).await;
	let browser = launch().await;
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join(".auth/storageState.json");

	let context = browser.new_context(None).await.unwrap();
	let page = context.new_page().await.unwrap();
	page.goto(server.url(), WaitUntil::Load).await.unwrap();
	page.evaluate_json("document.cookie = 'sid=good; path=/'; localStorage.setItem('token', 't-1')")
		.await
		.unwrap();

	let state = context.storage_state(Some(&path)).await.unwrap();
	assert!(state.cookies.iter().any(|c| c.name == "sid" && c.value == "good"));
	let origin = server.url().to_string();
	assert_eq!(state.local_storage(&origin).unwrap()[0].value, "t-1");
	assert!(path.exists());
	context.close().await.unwrap();

	let restored = browser.new_context(Some(&state)).await.unwrap();
	let page = restored.new_page().await.unwrap();
	page.goto(server.url(), WaitUntil::Load).await.unwrap();
	let cookie = page.evaluate_json("document.cookie").await.unwrap();
	assert!(cookie.as_str().unwrap().contains("sid=good"), "{cookie}");
	let token = page.evaluate_json("localStorage.getItem('token')").await.unwrap();
	assert_eq!(token, "t-1");

	browser.close().await.unwrap();
}

#[tokio::test]
#[ignore = "needs Chromium"]
async fn waiting_for_a_missing_element_times_out() {
	let server = TestServer::start(Router::new().route("/", get(|| async { Html(APP) }))).await;
	let browser = launch().await;
	let context = browser.new_context(None).await.unwrap();
	let page = context.new_page().await.unwrap();
	page.goto(server.url(), WaitUntil::DomContentLoaded).await.unwrap();

	let err = page
		.get_by_role("button", Some(TextMatcher::text("Create a project")))
		.click(Duration::from_millis(300))
		.await
		.unwrap_err();
	assert!(err.is_timeout(), "{err:?}");
	assert_eq!(page.locator("button").count().await.unwrap(), 2);

	browser.close().await.unwrap();
}
