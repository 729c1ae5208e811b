use super::error::GatewayError;
use super::logging;

#[test]
fn test_logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn test_unknown_levels_fall_back_to_info() {
    assert_eq!(logging::level_for("WARNING"), "warn");
    assert_eq!(logging::level_for("Trace"), "trace");
    assert_eq!(logging::level_for("verbose"), "info");
}

#[test]
fn test_json_errors_are_malformed_input() {
    let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let converted = GatewayError::from(err);
    assert!(matches!(converted, GatewayError::MalformedInput(_)));
}

#[test]
fn test_error_display_names_the_category() {
    let err = GatewayError::ResourceExhausted("subscriber limit of 2 reached".into());
    assert_eq!(
        err.to_string(),
        "resource exhausted: subscriber limit of 2 reached"
    );
}
