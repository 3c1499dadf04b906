use super::*;
use serial_test::serial;

const TEST_KEY_VAR: &str = "RAGQNA_TEST_API_KEY";

fn set_test_key(value: Option<&str>) {
    match value {
        // SAFETY: every test touching the environment runs under #[serial]
        Some(value) => unsafe { std::env::set_var(TEST_KEY_VAR, value) },
        // SAFETY: as above
        None => unsafe { std::env::remove_var(TEST_KEY_VAR) },
    }
}

fn provider_with_key_var() -> ProviderConfig {
    ProviderConfig {
        api_key_env: TEST_KEY_VAR.to_string(),
        ..ProviderConfig::default()
    }
}

#[test]
#[serial]
fn api_key_read_from_environment() {
    set_test_key(Some("  secret-key \n"));

    let provider = provider_with_key_var();
    assert_eq!(provider.api_key().as_deref(), Some("secret-key"));

    set_test_key(None);
}

#[test]
#[serial]
fn missing_api_key_is_none() {
    set_test_key(None);

    let provider = provider_with_key_var();
    assert_eq!(provider.api_key(), None);
}

#[test]
#[serial]
fn blank_api_key_is_none() {
    set_test_key(Some("   "));

    let provider = provider_with_key_var();
    assert_eq!(provider.api_key(), None);

    set_test_key(None);
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::InvalidUrl("invalid-url".to_string()),
        ConfigError::InvalidModel(String::new()),
        ConfigError::InvalidBatchSize(0),
        ConfigError::OverlapTooLarge(300, 200),
        ConfigError::FetchKTooSmall(1, 3),
        ConfigError::InvalidCollectionName("a b".to_string()),
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10, "message too short: {message}");
    }
}
