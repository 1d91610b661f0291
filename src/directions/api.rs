//! Google Directions API client and wire types

use super::{DirectionsError, DirectionsQuery};
use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

/// `{ "text": "5.2 km", "value": 5213 }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiStep {
    pub distance: TextValue,
    pub duration: TextValue,
    pub html_instructions: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiLeg {
    pub distance: TextValue,
    pub duration: TextValue,
    pub start_address: String,
    pub end_address: String,
    #[serde(default)]
    pub steps: Vec<ApiStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiRoute {
    #[serde(default)]
    pub legs: Vec<ApiLeg>,
}

/// Top-level Directions API response; only the fields we reduce are modelled
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectionsApiResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<ApiRoute>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Source of raw route data
#[async_trait]
pub trait RoutingApi: Send + Sync {
    async fn fetch(&self, query: &DirectionsQuery) -> Result<DirectionsApiResponse, DirectionsError>;
}

#[derive(Debug, Clone)]
pub struct GoogleDirectionsConfig {
    pub api_key: String,
    pub directions_url: String,
    pub timeout: Duration,
}

impl GoogleDirectionsConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, DirectionsError> {
        let api_key = config
            .get_maps_api_key()
            .map_err(|e| DirectionsError::NotConfigured(e.to_string()))?;
        Ok(Self {
            api_key,
            directions_url: config.maps.directions_url.clone(),
            timeout: config.maps.timeout(),
        })
    }
}

pub struct GoogleDirectionsClient {
    config: GoogleDirectionsConfig,
    client: Client,
}

impl GoogleDirectionsClient {
    pub fn new(config: GoogleDirectionsConfig) -> Result<Self, DirectionsError> {
        if config.api_key.is_empty() {
            return Err(DirectionsError::NotConfigured(
                "Google Maps API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DirectionsError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Query string pairs sent to the API (pure function)
    fn query_params(&self, query: &DirectionsQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("origin", query.origin_param()),
            ("destination", query.destination_param()),
        ];
        if let Some(waypoints) = query.waypoints_param() {
            params.push(("waypoints", waypoints));
        }
        params.push(("key", self.config.api_key.clone()));
        params
    }

    async fn request(&self, query: &DirectionsQuery) -> Result<DirectionsApiResponse, DirectionsError> {
        let response = self
            .client
            .get(&self.config.directions_url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|e| DirectionsError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Directions API returned an error status");
            return Err(DirectionsError::Status(status.as_u16()));
        }

        let body: DirectionsApiResponse = response
            .json()
            .await
            .map_err(|e| DirectionsError::InvalidResponse(e.without_url().to_string()))?;

        debug!(
            status = %body.status,
            routes = body.routes.len(),
            "Directions API response received"
        );

        Ok(body)
    }
}

#[async_trait]
impl RoutingApi for GoogleDirectionsClient {
    async fn fetch(&self, query: &DirectionsQuery) -> Result<DirectionsApiResponse, DirectionsError> {
        self.request(query)
            .instrument(crate::api_span!(api = "directions"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directions::LatLng;

    #[test]
    fn test_query_params_include_waypoints_and_key() {
        let client = GoogleDirectionsClient::new(GoogleDirectionsConfig {
            api_key: "k".to_string(),
            directions_url: "http://localhost/directions".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let query = DirectionsQuery {
            origin: LatLng::new(51.5, -0.12).unwrap(),
            destination: LatLng::new(52.2, 0.12).unwrap(),
            waypoints: vec![LatLng::new(51.75, -1.25).unwrap()],
        };

        let params = client.query_params(&query);
        assert_eq!(
            params,
            vec![
                ("origin", "51.5, -0.12".to_string()),
                ("destination", "52.2, 0.12".to_string()),
                ("waypoints", "51.75, -1.25".to_string()),
                ("key", "k".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_key_rejected() {
        let result = GoogleDirectionsClient::new(GoogleDirectionsConfig {
            api_key: String::new(),
            directions_url: "http://localhost/directions".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(DirectionsError::NotConfigured(_))));
    }

    #[test]
    fn test_response_tolerates_missing_routes() {
        let body: DirectionsApiResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS"}"#).unwrap();
        assert_eq!(body.status, "ZERO_RESULTS");
        assert!(body.routes.is_empty());
    }
}
