//! Local HTTP server standing in for the app.

#![allow(dead_code)]

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A router served on an ephemeral loopback port for the life of the test.
pub struct TestServer {
	base_url: String,
	task: JoinHandle<()>,
}

impl TestServer {
	pub async fn start(app: Router) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
		let addr = listener.local_addr().expect("test server address");
		let task = tokio::spawn(async move {
			axum::serve(listener, app).await.expect("test server crashed");
		});
		Self {
			base_url: format!("http://{addr}"),
			task,
		}
	}

	pub fn url(&self) -> &str {
		&self.base_url
	}

	pub fn host(&self) -> &str {
		"127.0.0.1"
	}
}

impl Drop for TestServer {
	fn drop(&mut self) {
		self.task.abort();
	}
}
