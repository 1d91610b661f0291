//! mapsite - user accounts and driving directions behind a small web backend
//!
//! # Overview
//!
//! This crate provides:
//! - A SQLite-backed store of users and their one-to-one profiles
//! - Signup, login and profile forms with field-level validation
//! - reCAPTCHA v3 verification of signup submissions
//! - Driving directions aggregated from the Google Directions API
//! - An AJAX-aware response layer that answers XHR requests with JSON
//!   envelopes and ordinary requests with redirects
//!
//! # Quick Start
//!
//! ```rust
//! use mapsite::forms::{Form, FormData, LoginForm};
//! use mapsite::ajax::AjaxResponse;
//!
//! let mut data = FormData::new();
//! data.insert("username".to_string(), "not-an-email".to_string());
//!
//! let errors = LoginForm::clean(&data).unwrap_err();
//! let envelope = AjaxResponse::error(errors.as_text());
//! assert!(envelope.message.starts_with("* username"));
//! ```

pub mod ajax;
pub mod auth;
pub mod captcha;
pub mod config;
pub mod directions;
pub mod error;
pub mod forms;
pub mod observability;
pub mod server;
pub mod store;
pub mod testing;

pub use config::*;
pub use error::AppError;
pub use server::{routes, serve, AppState};
pub use store::{ProfileStore, User, UserProfile};
