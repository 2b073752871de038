//! Tests for rule reconciliation.

use super::file::HbaFile;
use super::reconcile::{EntryResult, RuleReconciler};
use super::request::{ReconcileRequest, RuleSpec, RuleState, RulesBehavior};

const EXISTING: &str = "\
# managed by hand
local all postgres peer
host all all 127.0.0.1/32 scram-sha-256
";

fn spec(contype: &str) -> RuleSpec {
    RuleSpec::with_contype(contype)
}

fn host_rule(databases: &str, users: &str, address: &str, method: &str) -> RuleSpec {
    RuleSpec {
        databases: Some(databases.to_string()),
        users: Some(users.to_string()),
        address: Some(address.to_string()),
        method: Some(method.to_string()),
        ..spec("host")
    }
}

fn reconcile(request: &ReconcileRequest, content: &str) -> super::Reconciliation {
    RuleReconciler::new(request).reconcile(&HbaFile::parse(content))
}

mod single_rule {
    use super::*;

    #[test]
    fn adds_rule_to_empty_file_with_overwrite() {
        let request = ReconcileRequest::single(host_rule("db1", "user1", "2001:db8::1/128", "pam"))
            .with_overwrite(true);

        let outcome = reconcile(&request, "");

        assert!(outcome.changed);
        assert!(!outcome.failed);
        let json = serde_json::to_value(outcome.records()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "type": "host",
                "db": "db1",
                "usr": "user1",
                "src": "2001:db8::1/128",
                "method": "pam"
            }])
        );
    }

    #[test]
    fn only_contype_yields_built_in_defaults() {
        let request = ReconcileRequest::single(spec("host"));
        let outcome = reconcile(&request, "");

        let json = serde_json::to_value(outcome.records()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "db": "all",
                "method": "md5",
                "src": "samehost",
                "type": "host",
                "usr": "all"
            }])
        );
    }

    #[test]
    fn reapplying_is_idempotent() {
        let request = ReconcileRequest::single(host_rule("app", "app", "10.0.0.0/8", "trust"));

        let first = reconcile(&request, EXISTING);
        assert!(first.changed);

        let second = reconcile(&request, &first.file.render());
        assert!(!second.changed);
        assert_eq!(second.results, vec![EntryResult::applied(false)]);
    }

    #[test]
    fn overwrite_leaves_exactly_one_rule() {
        let rule = host_rule("db1", "user1", "10.0.0.0/8", "md5");
        let request = ReconcileRequest::single(rule.clone()).with_overwrite(true);

        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.changed);
        assert_eq!(outcome.file.rule_count(), 1);
        assert_eq!(outcome.file.rules().next(), Some(&rule.to_rule().unwrap()));
        assert_eq!(outcome.file.render(), "host db1 user1 10.0.0.0/8 md5\n");
    }

    #[test]
    fn overwrite_with_same_content_is_unchanged() {
        let request = ReconcileRequest::single(host_rule("db1", "user1", "10.0.0.0/8", "md5"))
            .with_overwrite(true);

        let outcome = reconcile(&request, "host db1 user1 10.0.0.0/8 md5\n");

        assert!(!outcome.changed);
    }

    #[test]
    fn replaces_method_of_existing_rule() {
        let request =
            ReconcileRequest::single(host_rule("all", "all", "127.0.0.1/32", "trust"));

        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.changed);
        assert_eq!(
            outcome.file.render(),
            "# managed by hand\nlocal all postgres peer\nhost all all 127.0.0.1/32 trust\n"
        );
    }

    #[test]
    fn absent_removes_rule() {
        let request = ReconcileRequest::single(RuleSpec {
            users: Some("postgres".to_string()),
            ..spec("local")
        })
        .with_state(RuleState::Absent);

        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.changed);
        assert_eq!(outcome.file.rule_count(), 1);
        assert!(outcome.file.render().starts_with("# managed by hand\n"));
    }

    #[test]
    fn absent_without_match_is_noop() {
        let request = ReconcileRequest::single(host_rule("db9", "nobody", "10.9.0.0/16", "md5"))
            .with_state(RuleState::Absent);

        let outcome = reconcile(&request, EXISTING);

        assert!(!outcome.changed);
        assert!(!outcome.failed);
    }

    #[test]
    fn invalid_rule_fails_without_change() {
        let request = ReconcileRequest::single(RuleSpec {
            address: Some("10.0.0.0/8".to_string()),
            netmask: Some("255.0.0.0".to_string()),
            ..spec("host")
        });

        let outcome = reconcile(&request, EXISTING);

        assert!(!outcome.changed);
        assert!(outcome.failed);
        assert!(outcome.msg.unwrap().contains("mutually exclusive"));
        assert_eq!(outcome.file.render(), EXISTING);
    }

    #[test]
    fn failed_overwrite_keeps_existing_rules() {
        let request = ReconcileRequest::single(RuleSpec::default()).with_overwrite(true);

        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.failed);
        assert!(!outcome.changed);
        assert_eq!(outcome.file.rule_count(), 2);
    }
}

mod comments {
    use super::*;

    #[test]
    fn unset_comment_keeps_existing_one() {
        let request = ReconcileRequest::single(host_rule("all", "all", "10.0.0.0/8", "trust"));

        let outcome = reconcile(&request, "host all all 10.0.0.0/8 md5 # office\n");

        assert_eq!(outcome.file.render(), "host all all 10.0.0.0/8 trust # office\n");
    }

    #[test]
    fn empty_comment_removes_existing_one() {
        let request = ReconcileRequest::single(RuleSpec {
            comment: Some(String::new()),
            ..host_rule("all", "all", "10.0.0.0/8", "md5")
        });

        let outcome = reconcile(&request, "host all all 10.0.0.0/8 md5 # office\n");

        assert!(outcome.changed);
        assert_eq!(outcome.file.render(), "host all all 10.0.0.0/8 md5\n");
    }

    #[test]
    fn empty_comment_on_uncommented_rule_is_unchanged() {
        let request = ReconcileRequest::single(RuleSpec {
            comment: Some("#".to_string()),
            ..host_rule("all", "all", "10.0.0.0/8", "md5")
        });

        let outcome = reconcile(&request, "host all all 10.0.0.0/8 md5\n");

        assert!(!outcome.changed);
    }
}

mod conflict_behavior {
    use super::*;

    #[test]
    fn disagreeing_entry_fails_alone() {
        let request = ReconcileRequest::list(vec![
            RuleSpec {
                method: Some("trust".to_string()),
                ..spec("host")
            },
            spec("hostssl"),
        ])
        .with_rule(RuleSpec {
            method: Some("md5".to_string()),
            ..RuleSpec::default()
        });

        let outcome = reconcile(&request, "");

        assert!(outcome.changed);
        assert!(!outcome.failed);
        assert!(outcome.msg.is_none());
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results[0].failed);
        assert!(!outcome.results[0].changed);
        assert!(outcome.results[0].msg.as_deref().unwrap().starts_with("method:"));
        assert_eq!(outcome.results[1], EntryResult::applied(true));
        assert_eq!(outcome.file.render(), "hostssl all all samehost md5\n");
    }

    #[test]
    fn all_entries_rejected_fails_operation() {
        let request = ReconcileRequest::list(vec![RuleSpec {
            users: Some("alice".to_string()),
            ..spec("host")
        }])
        .with_rule(RuleSpec {
            users: Some("bob".to_string()),
            ..RuleSpec::default()
        });

        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.failed);
        assert!(!outcome.changed);
        assert_eq!(
            outcome.msg.as_deref(),
            Some("users: rule sets 'alice' but the top-level option sets 'bob'")
        );
        assert_eq!(outcome.file.render(), EXISTING);
    }

    #[test]
    fn top_level_fields_do_not_fill_gaps() {
        let request = ReconcileRequest::list(vec![spec("host")]).with_rule(RuleSpec {
            method: Some("trust".to_string()),
            ..RuleSpec::default()
        });

        let outcome = reconcile(&request, "");

        assert_eq!(outcome.file.render(), "host all all samehost md5\n");
    }

    #[test]
    fn equivalent_addresses_do_not_conflict() {
        let request = ReconcileRequest::list(vec![host_rule("all", "all", "10.0.0.1", "md5")])
            .with_rule(RuleSpec {
                address: Some("10.0.0.1/32".to_string()),
                ..RuleSpec::default()
            });

        let outcome = reconcile(&request, "");

        assert!(!outcome.failed);
        assert_eq!(outcome.results[0], EntryResult::applied(true));
        assert_eq!(outcome.file.render(), "host all all 10.0.0.1/32 md5\n");
    }

    #[test]
    fn different_addresses_still_conflict() {
        let request = ReconcileRequest::list(vec![host_rule("all", "all", "10.0.0.1", "md5")])
            .with_rule(RuleSpec {
                address: Some("10.0.0.2".to_string()),
                ..RuleSpec::default()
            });

        let outcome = reconcile(&request, "");

        assert!(outcome.failed);
        assert!(outcome.msg.as_deref().unwrap().starts_with("address:"));
    }
}

mod combine_behavior {
    use super::*;

    fn combine(rules: Vec<RuleSpec>) -> ReconcileRequest {
        ReconcileRequest::list(rules)
            .with_rules_behavior(RulesBehavior::Combine)
            .with_rule(host_rule("db1", "user1", "10.0.0.0/8", "scram-sha-256"))
    }

    #[test]
    fn empty_entry_uses_custom_defaults() {
        let outcome = reconcile(&combine(vec![RuleSpec::default()]), "");

        assert!(outcome.changed);
        assert_eq!(outcome.file.render(), "host db1 user1 10.0.0.0/8 scram-sha-256\n");
    }

    #[test]
    fn partial_entry_fills_missing_fields() {
        let outcome = reconcile(
            &combine(vec![RuleSpec {
                users: Some("user2".to_string()),
                method: Some("trust".to_string()),
                ..RuleSpec::default()
            }]),
            "",
        );

        assert_eq!(outcome.file.render(), "host db1 user2 10.0.0.0/8 trust\n");
    }

    #[test]
    fn absent_entry_without_match_is_noop() {
        let outcome = reconcile(
            &combine(vec![RuleSpec {
                users: Some("ghost".to_string()),
                state: Some(RuleState::Absent),
                ..RuleSpec::default()
            }]),
            EXISTING,
        );

        assert!(!outcome.changed);
        assert!(!outcome.failed);
        assert_eq!(outcome.results, vec![EntryResult::applied(false)]);
    }

    #[test]
    fn entries_apply_in_order() {
        let outcome = reconcile(
            &combine(vec![
                RuleSpec::default(),
                RuleSpec {
                    state: Some(RuleState::Absent),
                    ..RuleSpec::default()
                },
                RuleSpec {
                    databases: Some("db2".to_string()),
                    ..RuleSpec::default()
                },
            ]),
            "",
        );

        assert_eq!(
            outcome.results,
            vec![
                EntryResult::applied(true),
                EntryResult::applied(true),
                EntryResult::applied(true),
            ]
        );
        assert_eq!(outcome.file.render(), "host db2 user1 10.0.0.0/8 scram-sha-256\n");
    }

    #[test]
    fn partial_failure_reports_each_entry() {
        let outcome = reconcile(
            &combine(vec![
                RuleSpec {
                    netmask: Some("255.0.0.0".to_string()),
                    address: Some("10.0.0.0/8".to_string()),
                    ..RuleSpec::default()
                },
                RuleSpec {
                    users: Some("user3".to_string()),
                    ..RuleSpec::default()
                },
            ]),
            "",
        );

        assert!(outcome.changed);
        assert!(!outcome.failed);
        assert!(outcome.results[0].failed);
        assert!(!outcome.results[1].failed);
        assert_eq!(outcome.file.rule_count(), 1);
    }
}

mod overwrite_lists {
    use super::*;

    #[test]
    fn empty_list_with_overwrite_clears_file() {
        let request = ReconcileRequest::list(Vec::new()).with_overwrite(true);
        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.changed);
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.file.render(), "");
    }

    #[test]
    fn overwrite_replaces_with_list_rules() {
        let request = ReconcileRequest::list(vec![
            RuleSpec {
                users: Some("postgres".to_string()),
                method: Some("peer".to_string()),
                ..spec("local")
            },
            host_rule("all", "all", "0.0.0.0/0", "scram-sha-256"),
        ])
        .with_overwrite(true);

        let outcome = reconcile(&request, EXISTING);

        assert!(outcome.changed);
        assert_eq!(
            outcome.file.render(),
            "local all postgres peer\nhost all all 0.0.0.0/0 scram-sha-256\n"
        );
    }
}
