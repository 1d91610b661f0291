//! Tests for logging configuration and format parsing

use mapsite::observability::logging::{
    init_logging, init_logging_with_level, parse_level, LogFormat,
};
use tracing::Level;

#[test]
fn test_log_format_parse_is_case_insensitive() {
    assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
    assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
    assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
}

#[test]
fn test_log_format_parse_invalid_defaults_to_json() {
    assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    assert_eq!(LogFormat::parse(""), LogFormat::Json);
    assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
}

#[test]
fn test_log_format_parse_whitespace() {
    assert_eq!(LogFormat::parse("  pretty  "), LogFormat::Pretty);
    assert_eq!(LogFormat::parse("json\n"), LogFormat::Json);
}

#[test]
fn test_log_level_parsing() {
    assert_eq!(parse_level("error"), Level::ERROR);
    assert_eq!(parse_level("WARN"), Level::WARN);
    assert_eq!(parse_level("debug"), Level::DEBUG);
    assert_eq!(parse_level("trace"), Level::TRACE);
    assert_eq!(parse_level("verbose"), Level::INFO);
}

#[test]
fn test_spans_can_be_created_after_init() {
    init_logging(Level::DEBUG, LogFormat::Compact, true);

    let span = mapsite::request_span!(method = "GET", path = "/map");
    let _entered = span.enter();
    let api = mapsite::api_span!(api = "directions");
    let _inner = api.enter();
    tracing::debug!("inside nested spans");
}

#[test]
fn test_verbose_level_init_does_not_panic() {
    init_logging_with_level(Some(Level::DEBUG));
    init_logging_with_level(None);
    tracing::debug!("after repeated init");
}
