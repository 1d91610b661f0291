//! Driving directions aggregation
//!
//! A query of origin, destination and optional waypoints is sent to the
//! routing API. When it answers `OK`, the first route's legs are reduced to
//! overall totals and each leg's steps are flattened into display-ready text.
//!
//! ```rust
//! use mapsite::directions::{summarize, DirectionsQuery, LatLng};
//! use mapsite::directions::api::DirectionsApiResponse;
//!
//! let query = DirectionsQuery {
//!     origin: LatLng::new(51.5074, -0.1278).unwrap(),
//!     destination: LatLng::new(51.7520, -1.2577).unwrap(),
//!     waypoints: vec![],
//! };
//! let response: DirectionsApiResponse = serde_json::from_value(serde_json::json!({
//!     "status": "OK",
//!     "routes": [{ "legs": [{
//!         "distance": { "text": "91.2 km", "value": 91234 },
//!         "duration": { "text": "1 hour 20 mins", "value": 4812 },
//!         "start_address": "London, UK",
//!         "end_address": "Oxford, UK",
//!         "steps": []
//!     }]}]
//! })).unwrap();
//!
//! let summary = summarize(&query, response).unwrap();
//! assert_eq!(summary.distance, "91.23 Km");
//! assert_eq!(summary.duration, "1 hour, 20 minutes and 12 seconds");
//! ```

pub mod api;
pub mod timespan;

use api::{ApiLeg, DirectionsApiResponse, RoutingApi};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

pub use timespan::format_timespan;

/// Message shown to the browser whenever directions cannot be produced
pub const RETRIEVAL_FAILED: &str = "Failed to retrieve directions";

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("Directions API is not configured: {0}")]
    NotConfigured(String),
    #[error("Directions request failed: {0}")]
    Network(String),
    #[error("Directions API returned HTTP {0}")]
    Status(u16),
    #[error("Directions response could not be parsed: {0}")]
    InvalidResponse(String),
    #[error("Directions API status {status}: {message}")]
    NotOk { status: String, message: String },
    #[error("Directions API returned no route")]
    NoRoute,
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// A latitude/longitude pair in decimal degrees
///
/// Keeps the text it was parsed from so the point is echoed back exactly as
/// submitted (`"51.50"` stays `"51.50"`).
#[derive(Debug, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
    lat_text: String,
    lng_text: String,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DirectionsError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DirectionsError::InvalidCoordinate(format!(
                "latitude {lat} is out of range"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(DirectionsError::InvalidCoordinate(format!(
                "longitude {lng} is out of range"
            )));
        }
        Ok(Self {
            lat,
            lng,
            lat_text: lat.to_string(),
            lng_text: lng.to_string(),
        })
    }

    /// Parse textual latitude and longitude, as submitted by a form
    pub fn parse(lat: &str, lng: &str) -> Result<Self, DirectionsError> {
        let parse = |label: &str, raw: &str| {
            raw.trim().parse::<f64>().map_err(|_| {
                DirectionsError::InvalidCoordinate(format!("{label} '{raw}' is not a number"))
            })
        };
        let point = Self::new(parse("latitude", lat)?, parse("longitude", lng)?)?;
        Ok(Self {
            lat_text: lat.trim().to_string(),
            lng_text: lng.trim().to_string(),
            ..point
        })
    }

    /// Latitude as submitted
    pub fn lat_text(&self) -> &str {
        &self.lat_text
    }

    /// Longitude as submitted
    pub fn lng_text(&self) -> &str {
        &self.lng_text
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat_text, self.lng_text)
    }
}

/// Points to route through, in travel order
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsQuery {
    pub origin: LatLng,
    pub destination: LatLng,
    pub waypoints: Vec<LatLng>,
}

impl DirectionsQuery {
    pub fn origin_param(&self) -> String {
        self.origin.to_string()
    }

    pub fn destination_param(&self) -> String {
        self.destination.to_string()
    }

    /// `|`-separated waypoints, or `None` when there are none
    pub fn waypoints_param(&self) -> Option<String> {
        if self.waypoints.is_empty() {
            return None;
        }
        Some(
            self.waypoints
                .iter()
                .map(LatLng::to_string)
                .collect::<Vec<_>>()
                .join("|"),
        )
    }
}

/// Letters naming the optional waypoints after `a` (origin) and `b` (destination)
const WAYPOINT_KEYS: std::ops::RangeInclusive<char> = 'c'..='z';

impl DirectionsQuery {
    /// Read `lat_a`/`long_a` (origin), `lat_b`/`long_b` (destination) and
    /// any `lat_c`/`long_c`, `lat_d`/`long_d`, ... waypoints
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, DirectionsError> {
        let point = |key: char| -> Result<Option<LatLng>, DirectionsError> {
            let lat = params.get(&format!("lat_{key}")).filter(|v| !v.trim().is_empty());
            let lng = params.get(&format!("long_{key}")).filter(|v| !v.trim().is_empty());
            match (lat, lng) {
                (Some(lat), Some(lng)) => LatLng::parse(lat, lng).map(Some),
                (None, None) => Ok(None),
                _ => Err(DirectionsError::InvalidCoordinate(format!(
                    "point {key} needs both lat_{key} and long_{key}"
                ))),
            }
        };
        let required = |key: char| {
            point(key)?.ok_or_else(|| {
                DirectionsError::InvalidCoordinate(format!("lat_{key} and long_{key} are required"))
            })
        };

        let origin = required('a')?;
        let destination = required('b')?;
        let mut waypoints = Vec::new();
        for key in WAYPOINT_KEYS {
            if let Some(waypoint) = point(key)? {
                waypoints.push(waypoint);
            }
        }

        Ok(Self {
            origin,
            destination,
            waypoints,
        })
    }

    /// Inverse of [`DirectionsQuery::from_params`], in key order
    pub fn to_params(&self) -> Vec<(String, String)> {
        let points = [&self.origin, &self.destination]
            .into_iter()
            .chain(self.waypoints.iter());
        ('a'..='z')
            .zip(points)
            .flat_map(|(key, point)| {
                [
                    (format!("lat_{key}"), point.lat_text.clone()),
                    (format!("long_{key}"), point.lng_text.clone()),
                ]
            })
            .collect()
    }
}

/// One instruction within a leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub distance: String,
    pub duration: String,
    pub instruction: String,
}

/// One origin-to-destination segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSummary {
    pub origin: String,
    pub destination: String,
    pub distance: String,
    pub duration: String,
    pub steps: Vec<StepSummary>,
}

/// Display-ready directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsSummary {
    pub origin: String,
    pub destination: String,
    /// Total distance, e.g. `"12.35 Km"`
    pub distance: String,
    /// Total duration, e.g. `"1 hour, 2 minutes and 5 seconds"`
    pub duration: String,
    pub route: Vec<LegSummary>,
}

/// Fetch and reduce directions for `query`
pub async fn get_directions(
    api: &dyn RoutingApi,
    query: &DirectionsQuery,
) -> Result<DirectionsSummary, DirectionsError> {
    let summary = api
        .fetch(query)
        .await
        .and_then(|response| summarize(query, response));
    match &summary {
        Ok(s) => info!(
            legs = s.route.len(),
            distance = %s.distance,
            duration = %s.duration,
            "directions retrieved"
        ),
        Err(e) => warn!(error = %e, "directions unavailable"),
    }
    summary
}

/// Reduce a raw API response into totals and per-leg steps (pure function)
pub fn summarize(
    query: &DirectionsQuery,
    response: DirectionsApiResponse,
) -> Result<DirectionsSummary, DirectionsError> {
    if response.status != "OK" {
        return Err(DirectionsError::NotOk {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }

    let legs = response
        .routes
        .into_iter()
        .next()
        .map(|route| route.legs)
        .filter(|legs| !legs.is_empty())
        .ok_or(DirectionsError::NoRoute)?;

    let total_metres: u64 = legs.iter().map(|leg| leg.distance.value).sum();
    let total_seconds: u64 = legs.iter().map(|leg| leg.duration.value).sum();

    Ok(DirectionsSummary {
        origin: query.origin_param(),
        destination: query.destination_param(),
        distance: format_kilometres(total_metres),
        duration: format_timespan(total_seconds),
        route: legs.into_iter().map(leg_summary).collect(),
    })
}

fn leg_summary(leg: ApiLeg) -> LegSummary {
    LegSummary {
        origin: leg.start_address,
        destination: leg.end_address,
        distance: leg.distance.text,
        duration: leg.duration.text,
        steps: leg
            .steps
            .into_iter()
            .map(|step| StepSummary {
                distance: step.distance.text,
                duration: step.duration.text,
                instruction: step.html_instructions,
            })
            .collect(),
    }
}

fn format_kilometres(metres: u64) -> String {
    format!("{:.2} Km", metres as f64 / 1000.0)
}
