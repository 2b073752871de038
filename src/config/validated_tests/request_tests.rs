//! Tests for building the reconcile request.

use crate::config::field;
use crate::hba::{ReconcileRequest, RuleState};

use super::*;

fn request(cli_args: &[&str], task: &str) -> ReconcileRequest {
    let mut args = vec!["--dest", "pg_hba.conf"];
    args.extend(cli_args);
    let toml = toml(task);
    ValidatedConfig::from_raw(&cli(&args), Some(&toml))
        .unwrap()
        .request
}

#[test]
fn cli_only_builds_single_rule_request() {
    let config = ValidatedConfig::from_raw(
        &cli(&["--dest", "pg_hba.conf", "--contype", "host", "--users", "app"]),
        None,
    )
    .unwrap();

    assert!(!config.request.is_list());
    assert_eq!(config.request.rule.contype.as_deref(), Some("host"));
    assert_eq!(config.request.rule.users.as_deref(), Some("app"));
}

#[test]
fn rules_list_comes_from_task_file() {
    let request = request(
        &["--contype", "hostssl"],
        r#"
        [[rules]]
        users = "a"

        [[rules]]
        users = "b"
        state = "absent"
    "#,
    );

    let rules = request.rules.as_ref().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[1].state, Some(RuleState::Absent));
    assert_eq!(request.rule.contype.as_deref(), Some("hostssl"));
}

#[test]
fn state_in_rule_section_is_rejected() {
    let toml = toml(
        r#"
        [rule]
        contype = "host"
        state = "absent"
    "#,
    );

    let result = ValidatedConfig::from_raw(&cli(&["--dest", "pg_hba.conf"]), Some(&toml));

    assert!(matches!(
        result,
        Err(ConfigError::Misplaced {
            field: field::RULE_STATE,
            ..
        })
    ));
}

#[test]
fn display_summarizes_request() {
    let config = ValidatedConfig::from_raw(
        &cli(&["--dest", "/etc/pg_hba.conf", "--overwrite"]),
        None,
    )
    .unwrap();

    let text = config.to_string();
    assert!(text.contains("dest: /etc/pg_hba.conf"));
    assert!(text.contains("overwrite: true"));
    assert!(text.contains("rules: single"));
    assert!(text.contains("rules_behavior: conflict"));
}
