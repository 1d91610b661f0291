use super::{error_reply, AppState};
use crate::ajax::{self, AjaxResponse};
use crate::auth::{hash_password, verify_password, SessionStore};
use crate::directions::{self, DirectionsQuery, RETRIEVAL_FAILED};
use crate::error::AppError;
use crate::forms::{Form, FormData, FormErrors, LoginForm, ProfileForm, SignupForm};
use crate::store::{NewUser, StoreError, User};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

pub const SIGNUP_SUCCESS: &str = "Thank you for signing up";
pub const SIGNUP_FAILED: &str = "There was an error, please try again";
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

type HandlerResult = Result<Response, Infallible>;

/// Resolve the session cookie to a live user
async fn current_user(state: &AppState, session_id: Option<&str>) -> Result<Option<User>, AppError> {
    let Some(session_id) = session_id else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.user_id(session_id).await else {
        return Ok(None);
    };
    Ok(state.store.get_user(user_id)?)
}

/// Where anonymous callers are sent, remembering where they were going
fn login_redirect(next: &str) -> Response {
    ajax::redirect_with_params("/sign-in", &[("next", next)])
}

fn with_session_cookie(response: Response, cookie: String) -> Response {
    warp::reply::with_header(response, "set-cookie", cookie).into_response()
}

pub async fn sign_up(ajax: bool, data: FormData, state: Arc<AppState>) -> HandlerResult {
    let form = match SignupForm::clean(&data) {
        Ok(form) => form,
        Err(errors) => return Ok(ajax::form_invalid(ajax, &[&errors])),
    };

    match state.store.find_user_by_username(&form.username) {
        Ok(Some(_)) => return Ok(duplicate_username(ajax)),
        Ok(None) => {}
        Err(e) => return Ok(error_reply(&e.into())),
    }

    let verdict = match state.captcha.verify(&form.token).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(error = %e, "reCAPTCHA verification unavailable");
            return Ok(signup_failed(ajax, &state));
        }
    };
    if !verdict.passes(state.config.recaptcha.min_score) {
        info!(
            score = ?verdict.score,
            error_codes = ?verdict.error_codes,
            "signup rejected by reCAPTCHA"
        );
        return Ok(signup_failed(ajax, &state));
    }

    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(e) => {
            return Ok(error_reply(&AppError::internal_error(format!(
                "password hashing failed: {e}"
            ))))
        }
    };
    let new_user = NewUser {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.username.clone(),
        username: form.username,
        password_hash,
    };
    let user = match state.store.create_user(&new_user) {
        Ok(user) => user,
        Err(StoreError::DuplicateUsername(_)) => return Ok(duplicate_username(ajax)),
        Err(e) => return Ok(error_reply(&e.into())),
    };
    if let Err(e) = state
        .store
        .set_captcha_score(user.id, verdict.score.unwrap_or(0.0))
    {
        return Ok(error_reply(&e.into()));
    }

    info!(user_id = user.id, "user signed up");
    let session_id = state.sessions.login(user.id).await;
    let response = ajax::respond(
        ajax,
        AjaxResponse::success(SIGNUP_SUCCESS),
        &state.config.server.success_redirect,
    );
    Ok(with_session_cookie(response, SessionStore::cookie(&session_id)))
}

fn duplicate_username(ajax: bool) -> Response {
    let mut errors = FormErrors::new();
    errors.add("username", DUPLICATE_USERNAME);
    ajax::form_invalid(ajax, &[&errors])
}

fn signup_failed(ajax: bool, state: &AppState) -> Response {
    ajax::respond(
        ajax,
        AjaxResponse::error(SIGNUP_FAILED),
        &state.config.server.success_redirect,
    )
}

pub async fn sign_in(ajax: bool, data: FormData, state: Arc<AppState>) -> HandlerResult {
    let form = match LoginForm::clean(&data) {
        Ok(form) => form,
        Err(errors) => return Ok(ajax::form_invalid(ajax, &[&errors])),
    };

    let user = match state.store.find_user_by_username(&form.username) {
        Ok(user) => user,
        Err(e) => return Ok(error_reply(&e.into())),
    };
    let user = match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            info!("failed sign-in attempt");
            return Ok(ajax::form_invalid(ajax, &[&LoginForm::invalid_login()]));
        }
    };

    match state.store.get_profile(user.id) {
        Ok(Some(profile)) if !profile.is_active => {
            return Ok(ajax::form_invalid(ajax, &[&LoginForm::invalid_login()]));
        }
        Ok(_) => {}
        Err(e) => return Ok(error_reply(&e.into())),
    }

    let session_id = state.sessions.login(user.id).await;
    info!(user_id = user.id, "user signed in");
    let response = ajax::form_valid(ajax, &state.config.server.success_redirect);
    Ok(with_session_cookie(response, SessionStore::cookie(&session_id)))
}

pub async fn sign_out(session_id: Option<String>, state: Arc<AppState>) -> HandlerResult {
    if let Some(session_id) = session_id {
        state.sessions.logout(&session_id).await;
    }
    Ok(with_session_cookie(
        ajax::redirect("/"),
        SessionStore::expired_cookie(),
    ))
}

#[derive(Debug, Serialize)]
struct AccountView<'a> {
    user: &'a User,
    profile: &'a crate::store::UserProfile,
}

pub async fn account(session_id: Option<String>, state: Arc<AppState>) -> HandlerResult {
    let user = match current_user(&state, session_id.as_deref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(login_redirect("/account")),
        Err(e) => return Ok(error_reply(&e)),
    };

    match state.store.get_profile(user.id) {
        Ok(Some(profile)) => Ok(warp::reply::json(&AccountView {
            user: &user,
            profile: &profile,
        })
        .into_response()),
        Ok(None) => Ok(error_reply(&AppError::not_found(format!(
            "profile for {user}"
        )))),
        Err(e) => Ok(error_reply(&e.into())),
    }
}

pub async fn update_account(
    ajax: bool,
    session_id: Option<String>,
    data: FormData,
    state: Arc<AppState>,
) -> HandlerResult {
    let user = match current_user(&state, session_id.as_deref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(login_redirect("/account")),
        Err(e) => return Ok(error_reply(&e)),
    };

    let form = match ProfileForm::clean(&data) {
        Ok(form) => form,
        Err(errors) => return Ok(ajax::form_invalid(ajax, &[&errors])),
    };

    if let Err(e) = state.store.update_profile(user.id, &form.fields) {
        return Ok(error_reply(&e.into()));
    }

    info!(user_id = user.id, "profile updated");
    Ok(ajax::form_valid(ajax, &state.config.server.success_redirect))
}

pub async fn route(
    session_id: Option<String>,
    data: FormData,
    state: Arc<AppState>,
) -> HandlerResult {
    match current_user(&state, session_id.as_deref()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let next = ajax::url_with_params("/map", &sorted(&data));
            return Ok(login_redirect(&next));
        }
        Err(e) => return Ok(error_reply(&e)),
    }

    match DirectionsQuery::from_params(&data) {
        Ok(query) => Ok(ajax::redirect_with_params("/map", &query.to_params())),
        Err(e) => Ok(error_reply(&e.into())),
    }
}

pub async fn map(
    session_id: Option<String>,
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> HandlerResult {
    match current_user(&state, session_id.as_deref()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let next = ajax::url_with_params("/map", &sorted(&params));
            return Ok(login_redirect(&next));
        }
        Err(e) => return Ok(error_reply(&e)),
    }

    let query = match DirectionsQuery::from_params(&params) {
        Ok(query) => query,
        Err(e) => return Ok(error_reply(&e.into())),
    };

    match directions::get_directions(state.routing.as_ref(), &query).await {
        Ok(summary) => Ok(warp::reply::json(&summary).into_response()),
        Err(_) => Ok(warp::reply::json(&json!({ "error": RETRIEVAL_FAILED })).into_response()),
    }
}

fn sorted(params: &HashMap<String, String>) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_unstable();
    pairs
}

pub async fn health(state: Arc<AppState>) -> HandlerResult {
    let status = state.health.report(&state.store);
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok(warp::reply::with_status(warp::reply::json(&status), code).into_response())
}

pub async fn live(state: Arc<AppState>) -> HandlerResult {
    Ok(warp::reply::json(&state.health.liveness()).into_response())
}
