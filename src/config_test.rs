use super::*;

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_true_variants() {
    for val in ["1", "true", "yes", "on", "TRUE", "On", "  yes  "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
}

#[test]
fn parse_bool_false_variants() {
    for val in ["0", "false", "no", "off", "False", " OFF "] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
}

#[test]
fn parse_bool_rejects_garbage() {
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

// =============================================================================
// env_parse: unique variable names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_parse_unset_uses_default() {
    let value: u32 = env_parse("__TEST_OPSDESK_UNSET_7781__", 42).unwrap();
    assert_eq!(value, 42);
}

#[test]
fn env_parse_reads_trimmed_value() {
    let key = "__TEST_OPSDESK_PARSE_7782__";
    unsafe { std::env::set_var(key, " 17 ") };
    let value: u32 = env_parse(key, 1).unwrap();
    assert_eq!(value, 17);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_blank_uses_default() {
    let key = "__TEST_OPSDESK_BLANK_7783__";
    unsafe { std::env::set_var(key, "   ") };
    let value: u16 = env_parse(key, 3000).unwrap();
    assert_eq!(value, 3000);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_invalid_is_error() {
    let key = "__TEST_OPSDESK_INVALID_7784__";
    unsafe { std::env::set_var(key, "lots") };
    let err = env_parse::<u32>(key, 1).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { value, .. } if value == "lots"));
    unsafe { std::env::remove_var(key) };
}

// =============================================================================
// AppConfig
// =============================================================================

#[test]
fn for_database_uses_defaults() {
    let config = AppConfig::for_database("postgres://localhost/opsdesk");
    assert_eq!(config.database_url, "postgres://localhost/opsdesk");
    assert_eq!(config.port, 3000);
    assert_eq!(config.db_max_connections, 5);
    assert_eq!(config.session_ttl, Duration::from_secs(168 * 3600));
    assert!(!config.cookie_secure);
    assert!(config.cors_allow_origin.is_none());
    assert!(config.bootstrap.is_none());
}

#[test]
fn session_ttl_accepts_hours_up_to_ten_years() {
    assert_eq!(session_ttl(1).unwrap(), Duration::from_secs(3600));
    assert_eq!(session_ttl(MAX_SESSION_TTL_HOURS).unwrap(), MAX_SESSION_TTL);
}

#[test]
fn session_ttl_rejects_zero_and_oversized_values() {
    for hours in [0, MAX_SESSION_TTL_HOURS + 1, u64::MAX] {
        let err = session_ttl(hours).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SESSION_TTL_HOURS", .. }), "hours = {hours}");
    }
}

#[test]
fn config_error_messages_name_the_key() {
    assert_eq!(ConfigError::Missing("DATABASE_URL").to_string(), "DATABASE_URL is required");
    let err = ConfigError::Invalid { key: "PORT", value: "abc".into() };
    assert!(err.to_string().contains("PORT"));
    assert!(err.to_string().contains("abc"));
}
