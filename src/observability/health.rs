//! Health and liveness reporting
//!
//! `/health` reports each dependency the service owns; `/live` only says the
//! process is answering. External APIs are not checked: a failed Google call
//! surfaces on the request that made it.

use crate::store::ProfileStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
    pub last_check: u64,
}

impl HealthCheck {
    fn healthy(message: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            message: Some(message.to_string()),
            last_check: current_timestamp(),
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message),
            last_check: current_timestamp(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: BTreeMap<String, HealthCheck>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub alive: bool,
    pub timestamp: u64,
}

/// Collects health checks for the running service
pub struct HealthReporter {
    started: Instant,
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn report(&self, store: &ProfileStore) -> HealthStatus {
        let mut checks = BTreeMap::new();
        checks.insert("database".to_string(), check_database(store));

        let overall = if checks.values().all(HealthCheck::is_healthy) {
            "healthy"
        } else {
            "degraded"
        };

        HealthStatus {
            status: overall.to_string(),
            timestamp: current_timestamp(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
            checks,
        }
    }

    pub fn liveness(&self) -> LivenessResponse {
        LivenessResponse {
            alive: true,
            timestamp: current_timestamp(),
        }
    }
}

fn check_database(store: &ProfileStore) -> HealthCheck {
    match store.ping() {
        Ok(()) => HealthCheck::healthy("database reachable"),
        Err(e) => HealthCheck::unhealthy(format!("database check failed: {e}")),
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
