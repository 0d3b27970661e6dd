use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::chat::ChatId;
use crate::messages;
use crate::registry::{SubscribeOutcome, UnsubscribeOutcome};
use crate::scheduler::PollReport;
use crate::service::AlertService;

/// Shared secret for every route except `/health`.
pub const ENV_API_TOKEN: &str = "ALERTS_API_TOKEN";

/// Read the API token from the environment. Blank counts as unset.
pub fn token_from_env() -> Option<String> {
    std::env::var(ENV_API_TOKEN)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Control surface for the chat transport: subscriptions, listings, manual
/// poll and manual digest.
///
/// Every route but `/health` needs `Authorization: Bearer <api_token>`. With
/// no token configured those routes answer 401.
pub fn router(service: AlertService, api_token: Option<String>) -> Router {
    let token = ApiToken(
        api_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Arc::from),
    );

    let protected = Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/subscribers", get(subscribers))
        .route("/bounties", get(bounties))
        .route("/events", get(events))
        .route("/start", get(start))
        .route("/help", get(help))
        .route("/poll", post(poll))
        .route("/digest", post(digest))
        .route_layer(middleware::from_fn_with_state(token, require_token));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(service)
}

#[derive(Clone)]
struct ApiToken(Option<Arc<str>>);

fn bearer_is_valid(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    let candidate = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();
    !candidate.is_empty() && candidate == expected
}

async fn require_token(State(token): State<ApiToken>, req: Request, next: Next) -> Response {
    if bearer_is_valid(req.headers(), token.0.as_deref()) {
        next.run(req).await
    } else {
        tracing::warn!(path = %req.uri().path(), "rejected unauthenticated request");
        (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
    }
}

/// Internal failures are logged here and answered with a bare 500.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

#[derive(Deserialize)]
struct SubscriberReq {
    id: ChatId,
}

async fn subscribe(
    State(svc): State<AlertService>,
    Json(body): Json<SubscriberReq>,
) -> Result<Json<SubscribeOutcome>, ApiError> {
    Ok(Json(svc.subscribe(body.id).await?))
}

async fn unsubscribe(
    State(svc): State<AlertService>,
    Json(body): Json<SubscriberReq>,
) -> Result<Json<UnsubscribeOutcome>, ApiError> {
    Ok(Json(svc.unsubscribe(body.id).await?))
}

#[derive(Serialize)]
struct SubscribersOut {
    count: usize,
}

async fn subscribers(State(svc): State<AlertService>) -> Json<SubscribersOut> {
    Json(SubscribersOut {
        count: svc.registry().count().await,
    })
}

/// Rendered chat text, ready to forward as-is.
#[derive(Serialize)]
struct TextOut {
    text: String,
}

async fn bounties(State(svc): State<AlertService>) -> Json<TextOut> {
    Json(TextOut {
        text: svc.bounty_list().await,
    })
}

async fn events(State(svc): State<AlertService>) -> Json<TextOut> {
    Json(TextOut {
        text: svc.event_list().await,
    })
}

async fn start(State(svc): State<AlertService>) -> Json<TextOut> {
    Json(TextOut { text: svc.welcome() })
}

async fn help() -> Json<TextOut> {
    Json(TextOut {
        text: messages::help(),
    })
}

async fn poll(State(svc): State<AlertService>) -> Json<PollReport> {
    Json(svc.poll_once().await)
}

#[derive(Deserialize)]
struct DigestQuery {
    destination: Option<ChatId>,
}

#[derive(Serialize)]
struct DigestOut {
    sent: bool,
}

/// `?destination=` must be the configured group or a current subscriber.
async fn digest(
    State(svc): State<AlertService>,
    Query(q): Query<DigestQuery>,
) -> Result<Response, ApiError> {
    let Some(dest) = q.destination.or(svc.default_destination()) else {
        return Ok((StatusCode::BAD_REQUEST, "no destination configured").into_response());
    };
    if Some(dest) != svc.default_destination() && !svc.registry().is_subscribed(dest).await {
        return Ok((StatusCode::FORBIDDEN, "unknown destination").into_response());
    }
    svc.send_digest_now(dest).await?;
    Ok(Json(DigestOut { sent: true }).into_response())
}
