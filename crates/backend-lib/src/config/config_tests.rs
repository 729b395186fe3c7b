use super::*;
use figment::Jail;

#[test]
fn test_settings_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.storage.path, PathBuf::from("data"));
    assert_eq!(settings.auth.session_ttl_secs, 604_800);
    assert_eq!(settings.auth.admin_username, "juan");
    assert_eq!(settings.cors.allowed_origins, vec!["http://localhost:5173"]);
    assert!(settings.validate().is_ok());
    assert!(settings.uses_default_secret());
}

#[test]
fn test_settings_validation() {
    let settings = Settings::default();

    let mut invalid = settings.clone();
    invalid.log_level = "loud".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.auth.session_ttl_secs = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.auth.jwt_secret.clear();
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.auth.hash_cost = 40;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.cors.allowed_origins.push("http://bad\norigin".to_string());
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.cors.allowed_origins = vec!["*".to_string()];
    assert!(invalid.validate().is_err());

    let mut invalid = settings;
    invalid.server.host = "not a host".to_string();
    assert!(invalid.validate().is_err());
}

#[test]
fn test_load_from_file_and_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "pushrelay.toml",
            r#"
            log_level = "debug"

            [server]
            host = "127.0.0.1"
            port = 8080

            [auth]
            session_ttl_secs = 3600

            [cors]
            allowed_origins = ["https://app.example.com"]
            "#,
        )?;
        jail.set_env("PUSHRELAY_AUTH__JWT_SECRET", "from-env");
        jail.set_env("PUSHRELAY_LOG_LEVEL", "warn");

        let settings = Settings::load().map_err(|e| e.to_string())?;
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.auth.session_ttl_secs, 3600);
        assert_eq!(settings.auth.jwt_secret, "from-env");
        // environment wins over the file
        assert_eq!(settings.log_level, "warn");
        // untouched fields keep their defaults
        assert_eq!(settings.auth.admin_username, "juan");
        assert_eq!(settings.cors.allowed_origins, vec!["https://app.example.com"]);
        Ok(())
    });
}

#[test]
fn test_legacy_env_variables() {
    Jail::expect_with(|jail| {
        jail.set_env("PORT", "4100");
        jail.set_env("JWT_SECRET", "legacy-secret");

        let settings = Settings::load_from("missing.toml").map_err(|e| e.to_string())?;
        assert_eq!(settings.server.port, 4100);
        assert_eq!(settings.auth.jwt_secret, "legacy-secret");
        assert!(!settings.uses_default_secret());
        Ok(())
    });
}

#[test]
fn test_invalid_file_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("bad.toml", "[auth]\nsession_ttl_secs = 0\n")?;
        assert!(Settings::load_from("bad.toml").is_err());
        Ok(())
    });
}
