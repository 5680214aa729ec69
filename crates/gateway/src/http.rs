//! HTTP surface over the session lifecycle core.
//!
//! Thin shaping layer: routes map one-to-one onto manager/dispatcher
//! operations and the core error taxonomy maps onto status codes. All state
//! lives in [`AppState`], created once at startup and shared by reference.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wagate::client::ChatClient;
use wagate::error::CoreError;
use wagate::session::StatusSnapshot;
use wagate::{MessageDispatcher, SessionManager};

/// Shared handler state; one instance per process.
pub struct AppState<C: ChatClient> {
	manager: Arc<SessionManager<C>>,
	dispatcher: Arc<MessageDispatcher<C>>,
	token: Option<String>,
}

impl<C: ChatClient> Clone for AppState<C> {
	fn clone(&self) -> Self {
		Self {
			manager: Arc::clone(&self.manager),
			dispatcher: Arc::clone(&self.dispatcher),
			token: self.token.clone(),
		}
	}
}

impl<C: ChatClient> AppState<C> {
	/// Creates handler state. An empty token disables the bearer check.
	pub fn new(manager: Arc<SessionManager<C>>, dispatcher: Arc<MessageDispatcher<C>>, token: Option<String>) -> Self {
		Self {
			manager,
			dispatcher,
			token: token.filter(|token| !token.is_empty()),
		}
	}
}

/// Builds the gateway router.
pub fn router<C: ChatClient>(state: AppState<C>) -> Router {
	Router::new()
		.route("/status", get(status::<C>))
		.route("/connect", post(connect::<C>))
		.route("/logout", post(logout::<C>))
		.route("/send", post(send::<C>))
		.layer(middleware::from_fn_with_state(state.clone(), require_bearer::<C>))
		.with_state(state)
}

/// Serves the router until the listener fails.
pub async fn serve<C: ChatClient>(listener: TcpListener, state: AppState<C>) -> std::io::Result<()> {
	axum::serve(listener, router(state)).await
}

/// JSON error body with the taxonomy code, per route table.
struct ApiError {
	status: StatusCode,
	code: &'static str,
	message: String,
}

impl From<CoreError> for ApiError {
	fn from(err: CoreError) -> Self {
		let status = match err.code() {
			"bad_request" => StatusCode::BAD_REQUEST,
			"not_connected" => StatusCode::CONFLICT,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};
		Self {
			status,
			code: err.code(),
			message: err.to_string(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(json!({ "code": self.code, "message": self.message }))).into_response()
	}
}

async fn require_bearer<C: ChatClient>(State(state): State<AppState<C>>, request: Request, next: Next) -> Response {
	let Some(token) = state.token.as_deref() else {
		return next.run(request).await;
	};

	let expected = format!("Bearer {token}");
	let provided = request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
	if provided == Some(expected.as_str()) {
		next.run(request).await
	} else {
		ApiError {
			status: StatusCode::UNAUTHORIZED,
			code: "unauthorized",
			message: "Bad or missing token".into(),
		}
		.into_response()
	}
}

fn status_body(snapshot: &StatusSnapshot) -> Value {
	json!({
		"connected": snapshot.connected,
		"device": snapshot.identity,
		"qr": snapshot.pairing_code,
	})
}

async fn status<C: ChatClient>(State(state): State<AppState<C>>) -> Json<Value> {
	Json(status_body(&state.manager.status()))
}

async fn connect<C: ChatClient>(State(state): State<AppState<C>>) -> Result<Json<Value>, ApiError> {
	state.manager.ensure_session().await?;

	let snapshot = state.manager.status();
	if snapshot.connected {
		Ok(Json(json!({ "connected": true, "device": snapshot.identity })))
	} else {
		// The pairing code arrives asynchronously; callers poll /status.
		Ok(Json(json!({ "qr": snapshot.pairing_code })))
	}
}

async fn logout<C: ChatClient>(State(state): State<AppState<C>>) -> Json<Value> {
	state.manager.logout().await;
	Json(json!({ "ok": true }))
}

#[derive(Debug, Default, Deserialize)]
struct SendBody {
	#[serde(default)]
	to: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

async fn send<C: ChatClient>(State(state): State<AppState<C>>, body: Bytes) -> Result<Json<Value>, ApiError> {
	// An absent body is treated like `{}`; a malformed one is a caller error.
	let body: SendBody = if body.is_empty() {
		SendBody::default()
	} else {
		serde_json::from_slice(&body).map_err(|err| ApiError {
			status: StatusCode::BAD_REQUEST,
			code: "bad_request",
			message: format!("invalid JSON body: {err}"),
		})?
	};
	let to = body.to.unwrap_or_default();
	let message = body.message.unwrap_or_default();

	let id = state.dispatcher.send(&to, &message).await?;
	Ok(Json(json!({ "ok": true, "id": id })))
}
