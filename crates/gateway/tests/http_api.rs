use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use wagate::MessageDispatcher;
use wagate::client::ClientEvent;
use wagate::client::fake::{FakeClient, FakeController};
use wagate::session::{CredentialStore, SessionManager};
use wagate_gateway::http::{self, AppState};
use wagate_protocol::Identity;

struct Gateway {
	addr: SocketAddr,
	controller: FakeController,
	_auth_dir: TempDir,
}

impl Gateway {
	fn url(&self, path: &str) -> String {
		format!("http://{}{}", self.addr, path)
	}
}

async fn spawn_gateway(token: Option<&str>) -> Gateway {
	let auth_dir = TempDir::new().expect("temp dir should be created");
	let (client, controller) = FakeClient::new();
	let manager = SessionManager::new(client, CredentialStore::new(auth_dir.path().join("auth")));
	let dispatcher = Arc::new(MessageDispatcher::new(Arc::clone(&manager)));
	let state = AppState::new(manager, dispatcher, token.map(str::to_string));

	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
	let addr = listener.local_addr().expect("local addr");
	tokio::spawn(http::serve(listener, state));

	Gateway {
		addr,
		controller,
		_auth_dir: auth_dir,
	}
}

async fn get_json(url: &str) -> (reqwest::StatusCode, Value) {
	let response = reqwest::get(url).await.expect("request should reach the gateway");
	let status = response.status();
	(status, response.json().await.expect("JSON body"))
}

async fn post_json(url: &str, body: Option<Value>) -> (reqwest::StatusCode, Value) {
	let client = reqwest::Client::new();
	let mut request = client.post(url);
	if let Some(body) = body {
		request = request.json(&body);
	}
	let response = request.send().await.expect("request should reach the gateway");
	let status = response.status();
	(status, response.json().await.expect("JSON body"))
}

async fn wait_for_status(gateway: &Gateway, mut condition: impl FnMut(&Value) -> bool) -> Value {
	for _ in 0..400 {
		let (_, body) = get_json(&gateway.url("/status")).await;
		if condition(&body) {
			return body;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("status condition not reached in time");
}

#[tokio::test]
async fn status_starts_disconnected() {
	let gateway = spawn_gateway(None).await;

	let (status, body) = get_json(&gateway.url("/status")).await;
	assert_eq!(status, reqwest::StatusCode::OK);
	assert_eq!(body["connected"], false);
	assert_eq!(body["device"], Value::Null);
	assert_eq!(body["qr"], Value::Null);
}

#[tokio::test]
async fn connect_pairing_and_handshake_flow() {
	let gateway = spawn_gateway(None).await;

	let (status, _) = post_json(&gateway.url("/connect"), None).await;
	assert_eq!(status, reqwest::StatusCode::OK);
	assert_eq!(gateway.controller.connect_calls(), 1);

	gateway.controller.emit(ClientEvent::PairingCode("2@pairing-token".into()));
	let body = wait_for_status(&gateway, |body| body["qr"] == "2@pairing-token").await;
	assert_eq!(body["connected"], false);

	gateway.controller.emit(ClientEvent::Open(Identity { id: "12345".into(), name: None }));
	let body = wait_for_status(&gateway, |body| body["connected"] == true).await;
	assert_eq!(body["device"]["id"], "12345");
	assert_eq!(body["qr"], Value::Null);

	// A second connect reports the established session without restarting it.
	let (status, body) = post_json(&gateway.url("/connect"), None).await;
	assert_eq!(status, reqwest::StatusCode::OK);
	assert_eq!(body["connected"], true);
	assert_eq!(body["device"]["id"], "12345");
	assert_eq!(gateway.controller.connect_calls(), 1);
}

#[tokio::test]
async fn send_with_missing_fields_is_bad_request() {
	let gateway = spawn_gateway(None).await;

	let (status, body) = post_json(&gateway.url("/send"), Some(json!({}))).await;
	assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
	assert_eq!(body["code"], "bad_request");
	assert_eq!(gateway.controller.connect_calls(), 0);
}

#[tokio::test]
async fn send_without_session_conflicts() {
	let gateway = spawn_gateway(None).await;

	let (status, body) = post_json(&gateway.url("/send"), Some(json!({"to": "+1 555", "message": "hi"}))).await;
	assert_eq!(status, reqwest::StatusCode::CONFLICT);
	assert_eq!(body["code"], "not_connected");
	assert_eq!(gateway.controller.connect_calls(), 1);
}

#[tokio::test]
async fn send_delivers_once_connected() {
	let gateway = spawn_gateway(None).await;

	let (_, _) = post_json(&gateway.url("/connect"), None).await;
	gateway.controller.emit(ClientEvent::Open(Identity { id: "12345".into(), name: None }));
	wait_for_status(&gateway, |body| body["connected"] == true).await;

	let (status, body) = post_json(
		&gateway.url("/send"),
		Some(json!({"to": "+1 (555) 123-4567", "message": "hello"})),
	)
	.await;
	assert_eq!(status, reqwest::StatusCode::OK);
	assert_eq!(body["ok"], true);
	assert_eq!(body["id"], "MSG-1");

	let sent = gateway.controller.sent();
	assert_eq!(sent.last().unwrap().0, "15551234567@s.whatsapp.net");
}

#[tokio::test]
async fn send_failure_maps_to_send_error() {
	let gateway = spawn_gateway(None).await;

	let (_, _) = post_json(&gateway.url("/connect"), None).await;
	gateway.controller.emit(ClientEvent::Open(Identity { id: "12345".into(), name: None }));
	wait_for_status(&gateway, |body| body["connected"] == true).await;

	gateway.controller.set_send_error(Some("stream errored"));
	let (status, body) = post_json(&gateway.url("/send"), Some(json!({"to": "15551234567", "message": "hi"}))).await;
	assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body["code"], "send_error");
}

#[tokio::test]
async fn logout_always_reports_ok() {
	let gateway = spawn_gateway(None).await;

	let (status, body) = post_json(&gateway.url("/logout"), None).await;
	assert_eq!(status, reqwest::StatusCode::OK);
	assert_eq!(body["ok"], true);

	let (_, _) = post_json(&gateway.url("/connect"), None).await;
	gateway.controller.emit(ClientEvent::Open(Identity { id: "12345".into(), name: None }));
	wait_for_status(&gateway, |body| body["connected"] == true).await;

	let (status, body) = post_json(&gateway.url("/logout"), None).await;
	assert_eq!(status, reqwest::StatusCode::OK);
	assert_eq!(body["ok"], true);
	let body = wait_for_status(&gateway, |body| body["connected"] == false).await;
	assert_eq!(body["device"], Value::Null);
}

#[tokio::test]
async fn bearer_token_gates_every_route() {
	let gateway = spawn_gateway(Some("secret")).await;
	let client = reqwest::Client::new();

	let response = client.get(gateway.url("/status")).send().await.unwrap();
	assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
	let body: Value = response.json().await.unwrap();
	assert_eq!(body["code"], "unauthorized");

	let response = client
		.post(gateway.url("/send"))
		.header("authorization", "Bearer wrong")
		.json(&json!({"to": "1", "message": "hi"}))
		.send()
		.await
		.unwrap();
	assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

	let response = client
		.get(gateway.url("/status"))
		.header("authorization", "Bearer secret")
		.send()
		.await
		.unwrap();
	assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn empty_token_disables_the_check() {
	let gateway = spawn_gateway(Some("")).await;

	let (status, _) = get_json(&gateway.url("/status")).await;
	assert_eq!(status, reqwest::StatusCode::OK);
}
