//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for sandboxed cwd and env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use vigil_config::VigilConfig;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[store]
path = "data/school.db"

[logging]
log_dir = "var/log/vigil"
retention_days = 14

[checks]
timeout_secs = 5
slow_query_ms = 250
sample_limit = 3
manifest_path = "manifest.toml"

[repair]
strict_safety = false
auto_repair = true
placeholder_domain = "backfill.invalid"
actor_id = "cron"
"#,
        )?;

        let config: VigilConfig = Figment::from(Serialized::defaults(VigilConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.store.path, "data/school.db");
        assert_eq!(config.logging.log_dir, "var/log/vigil");
        assert_eq!(config.logging.retention_days, 14);
        assert_eq!(config.logging.audit_retention_days, 365);
        assert_eq!(config.checks.timeout_secs, 5);
        assert_eq!(config.checks.slow_query_ms, 250);
        assert_eq!(config.checks.sample_limit, 3);
        assert!(config.checks.has_manifest());
        assert!(!config.repair.strict_safety);
        assert!(config.repair.auto_repair);
        assert_eq!(config.repair.placeholder_domain, "backfill.invalid");
        assert_eq!(config.repair.actor_id, "cron");
        assert_eq!(config.repair.snapshot_dir, ".vigil/snapshots");
        Ok(())
    });
}

#[test]
fn project_file_is_picked_up_from_dot_vigil() {
    Jail::expect_with(|jail| {
        jail.create_dir(".vigil")?;
        jail.create_file(
            ".vigil/config.toml",
            r#"
[repair]
step_timeout_secs = 9
"#,
        )?;

        let config = VigilConfig::load().expect("config loads");
        assert_eq!(config.repair.step_timeout_secs, 9);
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected_on_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".vigil")?;
        jail.create_file(
            ".vigil/config.toml",
            r#"
[repair]
placeholder_domain = "has space.invalid"
"#,
        )?;

        let err = VigilConfig::load().unwrap_err();
        assert!(err.to_string().contains("placeholder_domain"));
        Ok(())
    });
}

#[test]
fn missing_file_uses_defaults() {
    Jail::expect_with(|_jail| {
        let config = VigilConfig::load().expect("defaults load");
        assert_eq!(config.store.path, ".vigil/app.db");
        assert!(config.repair.strict_safety);
        Ok(())
    });
}
