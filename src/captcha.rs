//! reCAPTCHA token verification
//!
//! The browser widget hands the client a one-shot token which travels in the
//! signup form's hidden `token` field. The server forwards it, together with
//! the private key, to the siteverify endpoint and acts on the verdict.

use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn, Instrument};

/// Verdict returned by the siteverify endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptchaVerdict {
    pub success: bool,
    /// v3 only: 1.0 is very likely a human
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl CaptchaVerdict {
    /// Whether the verdict is a pass at the given score threshold
    pub fn passes(&self, min_score: Option<f64>) -> bool {
        match (min_score, self.score) {
            _ if !self.success => false,
            (Some(min), Some(score)) => score >= min,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("reCAPTCHA is not configured: {0}")]
    NotConfigured(String),
    #[error("reCAPTCHA request failed: {0}")]
    Network(String),
    #[error("reCAPTCHA returned HTTP {0}")]
    Status(u16),
    #[error("reCAPTCHA response could not be parsed: {0}")]
    InvalidResponse(String),
}

/// Anything that can turn a client token into a verdict
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError>;
}

#[derive(Debug, Clone)]
pub struct RecaptchaConfig {
    pub secret_key: String,
    pub verify_url: String,
    pub timeout: Duration,
}

impl RecaptchaConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CaptchaError> {
        let secret_key = config
            .get_recaptcha_secret()
            .map_err(|e| CaptchaError::NotConfigured(e.to_string()))?;
        Ok(Self {
            secret_key,
            verify_url: config.recaptcha.verify_url.clone(),
            timeout: config.recaptcha.timeout(),
        })
    }
}

/// Google siteverify client
pub struct RecaptchaClient {
    config: RecaptchaConfig,
    client: Client,
}

impl RecaptchaClient {
    pub fn new(config: RecaptchaConfig) -> Result<Self, CaptchaError> {
        if config.secret_key.is_empty() {
            return Err(CaptchaError::NotConfigured(
                "secret key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CaptchaError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaClient {
    async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError> {
        self.siteverify(token)
            .instrument(crate::api_span!(api = "recaptcha"))
            .await
    }
}

impl RecaptchaClient {
    async fn siteverify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError> {
        let response = self
            .client
            .post(&self.config.verify_url)
            .form(&[
                ("secret", self.config.secret_key.as_str()),
                ("response", token),
            ])
            .send()
            .await
            .map_err(|e| CaptchaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "siteverify returned an error status");
            return Err(CaptchaError::Status(status.as_u16()));
        }

        let verdict: CaptchaVerdict = response
            .json()
            .await
            .map_err(|e| CaptchaError::InvalidResponse(e.to_string()))?;

        debug!(
            success = verdict.success,
            score = ?verdict.score,
            error_codes = ?verdict.error_codes,
            "reCAPTCHA verdict received"
        );

        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(success: bool, score: Option<f64>) -> CaptchaVerdict {
        CaptchaVerdict {
            success,
            score,
            action: None,
            challenge_ts: None,
            hostname: None,
            error_codes: vec![],
        }
    }

    #[test]
    fn test_passes_without_threshold() {
        assert!(verdict(true, None).passes(None));
        assert!(verdict(true, Some(0.1)).passes(None));
        assert!(!verdict(false, Some(0.9)).passes(None));
    }

    #[test]
    fn test_passes_with_threshold() {
        assert!(verdict(true, Some(0.7)).passes(Some(0.5)));
        assert!(verdict(true, Some(0.5)).passes(Some(0.5)));
        assert!(!verdict(true, Some(0.3)).passes(Some(0.5)));
        assert!(!verdict(true, None).passes(Some(0.5)));
    }

    #[test]
    fn test_verdict_deserializes_error_codes() {
        let verdict: CaptchaVerdict = serde_json::from_str(
            r#"{"success": false, "error-codes": ["invalid-input-response"]}"#,
        )
        .unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.error_codes, vec!["invalid-input-response"]);
        assert_eq!(verdict.score, None);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = RecaptchaClient::new(RecaptchaConfig {
            secret_key: String::new(),
            verify_url: "http://localhost/verify".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(CaptchaError::NotConfigured(_))));
    }
}
