//! HTTP surface
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/sign-up` | signup form with reCAPTCHA token |
//! | POST | `/sign-in` | login form, sets the session cookie |
//! | GET | `/sign-out` | ends the session |
//! | GET/POST | `/account` | read or edit the caller's profile |
//! | POST | `/route` | redirect the route form to `/map` |
//! | GET | `/map` | aggregated driving directions |
//! | GET | `/health`, `/live` | health checks |

mod handlers;

use crate::auth::{SessionStore, SESSION_COOKIE};
use crate::captcha::CaptchaVerifier;
use crate::config::{AppConfig, ConfigError};
use crate::directions::api::RoutingApi;
use crate::error::AppError;
use crate::forms::FormData;
use crate::observability::HealthReporter;
use crate::store::ProfileStore;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Shared state handed to every handler
pub struct AppState {
    pub config: AppConfig,
    pub store: ProfileStore,
    pub sessions: SessionStore,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub routing: Arc<dyn RoutingApi>,
    pub health: HealthReporter,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: ProfileStore,
        captcha: Arc<dyn CaptchaVerifier>,
        routing: Arc<dyn RoutingApi>,
    ) -> Self {
        Self {
            config,
            store,
            sessions: SessionStore::new(),
            captcha,
            routing,
            health: HealthReporter::new(),
        }
    }
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn ajax() -> impl Filter<Extract = (bool,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-requested-with")
        .map(|value: Option<String>| crate::ajax::is_ajax(value.as_deref()))
}

fn session() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::cookie::optional(SESSION_COOKIE)
}

fn form_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(16 * 1024).and(warp::body::form::<FormData>())
}

/// Every route, with rejection handling and request tracing
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let sign_up = warp::path!("sign-up")
        .and(warp::post())
        .and(ajax())
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(handlers::sign_up);

    let sign_in = warp::path!("sign-in")
        .and(warp::post())
        .and(ajax())
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(handlers::sign_in);

    let sign_out = warp::path!("sign-out")
        .and(warp::get())
        .and(session())
        .and(with_state(state.clone()))
        .and_then(handlers::sign_out);

    let account_get = warp::path!("account")
        .and(warp::get())
        .and(session())
        .and(with_state(state.clone()))
        .and_then(handlers::account);

    let account_post = warp::path!("account")
        .and(warp::post())
        .and(ajax())
        .and(session())
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(handlers::update_account);

    let route = warp::path!("route")
        .and(warp::post())
        .and(session())
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(handlers::route);

    let map = warp::path!("map")
        .and(warp::get())
        .and(session())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(handlers::map);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::health);

    let live = warp::path!("live")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::live);

    sign_up
        .or(sign_in)
        .unify()
        .or(sign_out)
        .unify()
        .or(account_get)
        .unify()
        .or(account_post)
        .unify()
        .or(route)
        .unify()
        .or(map)
        .unify()
        .or(health)
        .unify()
        .or(live)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::trace::trace(|info: warp::trace::Info<'_>| {
            crate::request_span!(method = %info.method(), path = %info.path())
        }))
}

/// JSON error reply for an [`AppError`]
pub fn error_reply(error: &AppError) -> Response {
    warp::reply::with_status(warp::reply::json(&error.to_body()), error.status_code())
        .into_response()
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    if let Some(error) = rejection.find::<AppError>() {
        return Ok(error_reply(error));
    }

    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&crate::error::ErrorBody { error: message }),
        status,
    )
    .into_response())
}

/// Socket address from the `[server]` section
pub fn bind_address(config: &AppConfig) -> Result<SocketAddr, ConfigError> {
    format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "server address {}:{} is invalid: {e}",
                config.server.host, config.server.port
            ))
        })
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = bind_address(&state.config)?;
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| AppError::internal_error(format!("failed to bind {addr}: {e}")))?;

    info!(address = %bound, "mapsite listening");
    server.await;
    info!("server stopped");
    Ok(())
}
