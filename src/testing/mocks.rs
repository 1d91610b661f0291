//! Mock implementations for testing
//!
//! Stand-ins for the reCAPTCHA verifier and the routing API so handlers can
//! be exercised without network access.

use crate::captcha::{CaptchaError, CaptchaVerdict, CaptchaVerifier};
use crate::directions::api::{DirectionsApiResponse, RoutingApi};
use crate::directions::{DirectionsError, DirectionsQuery};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock reCAPTCHA verifier returning a fixed verdict
#[derive(Debug, Default)]
pub struct MockCaptchaVerifier {
    pub verdict: Option<CaptchaVerdict>,
    pub seen_tokens: Arc<Mutex<Vec<String>>>,
}

impl MockCaptchaVerifier {
    /// Every token passes with the given score
    pub fn passing(score: f64) -> Self {
        Self {
            verdict: Some(CaptchaVerdict {
                success: true,
                score: Some(score),
                action: Some("signup".to_string()),
                challenge_ts: None,
                hostname: Some("localhost".to_string()),
                error_codes: vec![],
            }),
            ..Default::default()
        }
    }

    /// Every token is rejected
    pub fn failing() -> Self {
        Self {
            verdict: Some(CaptchaVerdict {
                success: false,
                score: None,
                action: None,
                challenge_ts: None,
                hostname: None,
                error_codes: vec!["invalid-input-response".to_string()],
            }),
            ..Default::default()
        }
    }

    /// The verification endpoint is unreachable
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub async fn get_seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().await.clone()
    }
}

#[async_trait]
impl CaptchaVerifier for MockCaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError> {
        self.seen_tokens.lock().await.push(token.to_string());
        self.verdict
            .clone()
            .ok_or_else(|| CaptchaError::Network("mock verifier unavailable".to_string()))
    }
}

/// Mock routing API returning a canned response
#[derive(Debug, Default)]
pub struct MockRoutingApi {
    pub response: Option<DirectionsApiResponse>,
    pub queries: Arc<Mutex<Vec<DirectionsQuery>>>,
}

impl MockRoutingApi {
    pub fn with_response(response: DirectionsApiResponse) -> Self {
        Self {
            response: Some(response),
            ..Default::default()
        }
    }

    /// A two-leg `OK` response: 10.5 km / 15 min then 4.5 km / 5 min
    pub fn two_legs() -> Self {
        let body = json!({
            "status": "OK",
            "routes": [{
                "legs": [
                    {
                        "distance": { "text": "10.5 km", "value": 10500 },
                        "duration": { "text": "15 mins", "value": 900 },
                        "start_address": "Start St, Springfield",
                        "end_address": "Middle Rd, Springfield",
                        "steps": [{
                            "distance": { "text": "10.5 km", "value": 10500 },
                            "duration": { "text": "15 mins", "value": 900 },
                            "html_instructions": "Head <b>east</b>"
                        }]
                    },
                    {
                        "distance": { "text": "4.5 km", "value": 4500 },
                        "duration": { "text": "5 mins", "value": 300 },
                        "start_address": "Middle Rd, Springfield",
                        "end_address": "End Ave, Shelbyville",
                        "steps": []
                    }
                ]
            }]
        });
        match serde_json::from_value(body) {
            Ok(response) => Self::with_response(response),
            Err(e) => panic!("canned directions response is invalid: {e}"),
        }
    }

    /// The API answers with a non-OK status
    pub fn denied() -> Self {
        Self::with_response(DirectionsApiResponse {
            status: "REQUEST_DENIED".to_string(),
            routes: vec![],
            error_message: Some("The provided API key is invalid.".to_string()),
        })
    }

    pub async fn get_queries(&self) -> Vec<DirectionsQuery> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl RoutingApi for MockRoutingApi {
    async fn fetch(
        &self,
        query: &DirectionsQuery,
    ) -> Result<DirectionsApiResponse, DirectionsError> {
        self.queries.lock().await.push(query.clone());
        self.response
            .clone()
            .ok_or_else(|| DirectionsError::Network("mock routing API unavailable".to_string()))
    }
}
