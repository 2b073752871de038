//! Tests for CLI vs TOML precedence rules.

use crate::hba::{RuleState, RulesBehavior};

use super::*;

mod cli_precedence {
    use super::*;

    #[test]
    fn cli_dest_overrides_toml() {
        let cli = cli(&["--dest", "/cli/pg_hba.conf"]);
        let toml = toml(
            r#"
            [file]
            dest = "/toml/pg_hba.conf"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.dest.to_str(), Some("/cli/pg_hba.conf"));
    }

    #[test]
    fn cli_state_overrides_toml() {
        let cli = cli(&["--dest", "pg_hba.conf", "--state", "present"]);
        let toml = toml(
            r#"
            [reconcile]
            state = "absent"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.request.state, RuleState::Present);
    }

    #[test]
    fn cli_rules_behavior_overrides_toml() {
        let cli = cli(&["--dest", "pg_hba.conf", "--rules-behavior", "combine"]);
        let toml = toml(
            r#"
            [reconcile]
            rules_behavior = "conflict"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.request.rules_behavior, RulesBehavior::Combine);
    }

    #[test]
    fn cli_rule_field_replaces_only_that_field() {
        let cli = cli(&["--dest", "pg_hba.conf", "--method", "trust"]);
        let toml = toml(
            r#"
            [rule]
            contype = "host"
            users = "app"
            method = "md5"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();
        let rule = &config.request.rule;

        assert_eq!(rule.method.as_deref(), Some("trust"));
        assert_eq!(rule.contype.as_deref(), Some("host"));
        assert_eq!(rule.users.as_deref(), Some("app"));
    }
}

mod toml_fallback {
    use super::*;

    #[test]
    fn toml_values_used_without_cli() {
        let toml = toml(
            r#"
            [file]
            dest = "pg_hba.conf"

            [reconcile]
            state = "Absent"
            rules_behavior = "COMBINE"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert_eq!(config.request.state, RuleState::Absent);
        assert_eq!(config.request.rules_behavior, RulesBehavior::Combine);
    }

    #[test]
    fn defaults_used_without_any_source() {
        let config = ValidatedConfig::from_raw(&cli(&["--dest", "pg_hba.conf"]), None).unwrap();

        assert_eq!(config.request.state, RuleState::Present);
        assert_eq!(config.request.rules_behavior, RulesBehavior::Conflict);
        assert!(!config.request.overwrite);
        assert!(!config.create);
        assert!(!config.backup);
        assert!(!config.check);
        assert!(!config.diff);
    }
}

mod flags {
    use super::*;

    #[test]
    fn toml_flags_enable() {
        let toml = toml(
            r#"
            [file]
            dest = "pg_hba.conf"
            create = true
            backup = true

            [reconcile]
            overwrite = true
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert!(config.create);
        assert!(config.backup);
        assert!(config.request.overwrite);
    }

    #[test]
    fn cli_flags_enable() {
        let cli = cli(&[
            "--dest",
            "pg_hba.conf",
            "--create",
            "--backup",
            "--overwrite",
            "--check",
            "--diff",
        ]);

        let config = ValidatedConfig::from_raw(&cli, None).unwrap();

        assert!(config.create);
        assert!(config.backup);
        assert!(config.request.overwrite);
        assert!(config.check);
        assert!(config.diff);
    }
}

mod invalid_values {
    use super::*;

    #[test]
    fn invalid_toml_state_returns_error() {
        let toml = toml(
            r#"
            [file]
            dest = "pg_hba.conf"

            [reconcile]
            state = "removed"
        "#,
        );

        let result = ValidatedConfig::from_raw(&cli(&[]), Some(&toml));

        assert!(matches!(result, Err(ConfigError::InvalidState { .. })));
    }

    #[test]
    fn invalid_toml_rules_behavior_returns_error() {
        let toml = toml(
            r#"
            [file]
            dest = "pg_hba.conf"

            [reconcile]
            rules_behavior = "merge"
        "#,
        );

        let result = ValidatedConfig::from_raw(&cli(&[]), Some(&toml));

        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid rules_behavior 'merge': expected conflict or combine"
        );
    }
}
