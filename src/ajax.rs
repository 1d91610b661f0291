//! Uniform JSON envelopes for AJAX form submissions
//!
//! The browser posts forms with `X-Requested-With: XMLHttpRequest` and expects
//! `{"result": "Success" | "Error", "message": "..."}` back. Plain form posts
//! get a redirect on success instead.

use crate::forms::{concat_errors, FormErrors};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

pub const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AjaxResult {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AjaxResponse {
    pub result: AjaxResult,
    pub message: String,
}

impl AjaxResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self {
            result: AjaxResult::Success,
            message: message.into(),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            result: AjaxResult::Error,
            message: message.into(),
        }
    }
}

impl Reply for AjaxResponse {
    fn into_response(self) -> Response {
        warp::reply::json(&self).into_response()
    }
}

/// Whether the `X-Requested-With` header marks an AJAX call
pub fn is_ajax(requested_with: Option<&str>) -> bool {
    requested_with.is_some_and(|value| value.eq_ignore_ascii_case(AJAX_HEADER_VALUE))
}

/// Reply for forms that failed validation
pub fn form_invalid(ajax: bool, forms: &[&FormErrors]) -> Response {
    let message = concat_errors(forms.iter().copied());
    if ajax {
        AjaxResponse::error(message).into_response()
    } else {
        warp::reply::with_status(message, StatusCode::BAD_REQUEST).into_response()
    }
}

/// Reply for forms that validated and were saved
pub fn form_valid(ajax: bool, success_url: &str) -> Response {
    if ajax {
        AjaxResponse::success("").into_response()
    } else {
        redirect(success_url)
    }
}

/// Deliver an envelope: JSON for AJAX, otherwise a redirect on success or a
/// `400` carrying the message on error
pub fn respond(ajax: bool, envelope: AjaxResponse, success_url: &str) -> Response {
    match (ajax, envelope.result) {
        (true, _) => envelope.into_response(),
        (false, AjaxResult::Success) => redirect(success_url),
        (false, AjaxResult::Error) => {
            warp::reply::with_status(envelope.message, StatusCode::BAD_REQUEST).into_response()
        }
    }
}

/// `302 Found` to `location`
pub fn redirect(location: &str) -> Response {
    warp::reply::with_header(
        warp::reply::with_status(warp::reply(), StatusCode::FOUND),
        "location",
        location,
    )
    .into_response()
}

/// Append urlencoded `params` to `url`; the URL is returned untouched when there are none
pub fn url_with_params<K, V>(url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return url.to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish();
    format!("{url}?{query}")
}

/// Redirect to `url` carrying `params` in the query string
pub fn redirect_with_params<K, V>(url: &str, params: &[(K, V)]) -> Response
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    redirect(&url_with_params(url, params))
}
