use std::io::Write;
use std::time::Duration;

use hrdc_cli::config::Config;

#[test]
fn test_from_file_reads_all_sections() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
        [supabase]
        url = "https://abc.supabase.co"

        [responder]
        url = "https://agents.example.com/webhook"
        timeout_ms = 30000

        [session]
        profile_timeout_ms = 1000
        redirect_url = "https://app.example.com/auth"

        [storage]
        artifacts_dir = "/tmp/hrdc-session"

        [logging]
        level = "info"
        format = "json"
        "#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.responder.timeout(), Duration::from_secs(30));
    assert_eq!(config.session.profile_timeout(), Duration::from_secs(1));
    assert_eq!(
        config.session.redirect_url.as_deref(),
        Some("https://app.example.com/auth")
    );
    assert_eq!(config.sync.store_timeout(), Duration::from_secs(3));
    assert_eq!(config.storage.artifacts_dir, "/tmp/hrdc-session");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_shipped_defaults_parse() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");

    let config = Config::from_file(path).unwrap();

    assert_eq!(config.responder.url, "https://agents.customcx.com/webhook/HDRC");
    assert_eq!(config.responder.timeout(), Duration::from_secs(20));
    assert_eq!(config.sync.responder_timeout(), Duration::from_secs(20));
    assert!(config.paystack_public_key.is_empty());
}
