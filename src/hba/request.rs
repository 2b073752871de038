//! Caller-facing rule requests.
//!
//! A [`RuleSpec`] is a partial rule: every field is optional. It becomes a
//! [`Rule`] once the unset fields are filled from custom defaults (under
//! [`RulesBehavior::Combine`]) and then from the built-in defaults.

use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;

use super::defaults;
use super::error::{RuleError, field};
use super::rule::{ConnType, Rule, Source, mutually_exclusive_netmask, normalize_list, parse_method};

/// Whether a rule should exist in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    /// Add the rule, or replace the rule with the same identity.
    #[default]
    Present,
    /// Remove every rule with the same identity.
    Absent,
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// How top-level rule fields interact with entries of a `rules` list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RulesBehavior {
    /// A top-level field that disagrees with an entry field fails that entry.
    #[default]
    Conflict,
    /// Top-level fields fill the fields an entry leaves unset.
    Combine,
}

impl fmt::Display for RulesBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Combine => write!(f, "combine"),
        }
    }
}

/// A partially specified rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Connection type
    #[serde(alias = "type")]
    pub contype: Option<String>,

    /// Comma-joined database list
    #[serde(alias = "db")]
    pub databases: Option<String>,

    /// Comma-joined user list
    #[serde(alias = "usr")]
    pub users: Option<String>,

    /// Client address: CIDR network, IP, keyword or host name
    #[serde(alias = "source", alias = "src")]
    pub address: Option<String>,

    /// Netmask for a plain IP address
    pub netmask: Option<String>,

    /// Authentication method
    pub method: Option<String>,

    /// Authentication options
    pub options: Option<String>,

    /// Inline comment
    pub comment: Option<String>,

    /// Per-entry state, overriding the top-level state
    pub state: Option<RuleState>,
}

impl RuleSpec {
    /// Creates a spec with only the connection type set.
    #[must_use]
    pub fn with_contype(contype: impl Into<String>) -> Self {
        Self {
            contype: Some(contype.into()),
            ..Self::default()
        }
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none()) && self.state.is_none()
    }

    /// Returns the rule fields as `(name, value)` pairs.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, Option<&str>); 8] {
        [
            (field::CONTYPE, self.contype.as_deref()),
            (field::DATABASES, self.databases.as_deref()),
            (field::USERS, self.users.as_deref()),
            (field::ADDRESS, self.address.as_deref()),
            (field::NETMASK, self.netmask.as_deref()),
            (field::METHOD, self.method.as_deref()),
            (field::OPTIONS, self.options.as_deref()),
            (field::COMMENT, self.comment.as_deref()),
        ]
    }

    /// Checks that no field set here disagrees with the same field in `top_level`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Conflict`] naming the first disagreeing field.
    pub fn check_conflicts(&self, top_level: &Self) -> Result<(), RuleError> {
        for ((name, entry), (_, top)) in self.fields().into_iter().zip(top_level.fields()) {
            if let (Some(entry), Some(top)) = (entry, top) {
                if canonical(name, entry) != canonical(name, top) {
                    return Err(RuleError::Conflict {
                        field: name,
                        entry: entry.to_string(),
                        top_level: top.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fills the fields left unset here from `defaults`.
    ///
    /// Address and netmask travel together: they are inherited only when
    /// this spec sets neither, and never for local rules.
    #[must_use]
    pub fn combined_with(&self, defaults: &Self) -> Self {
        let contype = self.contype.clone().or_else(|| defaults.contype.clone());
        let is_local = contype
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(ConnType::Local.as_str()));
        let inherit_source = !is_local && self.address.is_none() && self.netmask.is_none();

        let (address, netmask) = if inherit_source {
            (defaults.address.clone(), defaults.netmask.clone())
        } else {
            (self.address.clone(), self.netmask.clone())
        };

        Self {
            contype,
            databases: self.databases.clone().or_else(|| defaults.databases.clone()),
            users: self.users.clone().or_else(|| defaults.users.clone()),
            address,
            netmask,
            method: self.method.clone().or_else(|| defaults.method.clone()),
            options: self.options.clone().or_else(|| defaults.options.clone()),
            comment: self.comment.clone().or_else(|| defaults.comment.clone()),
            state: self.state.or(defaults.state),
        }
    }

    /// Resolves this spec into a rule, applying built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if address and netmask collide, the connection type
    /// is missing, or any field fails validation.
    pub fn to_rule(&self) -> Result<Rule, RuleError> {
        if let (Some(address), Some(_)) = (&self.address, &self.netmask) {
            if address.contains('/') {
                return Err(mutually_exclusive_netmask(address));
            }
        }

        let conn_type = self
            .contype
            .as_deref()
            .ok_or(RuleError::missing(field::CONTYPE))?
            .parse::<ConnType>()?;

        let databases = normalize_list(
            field::DATABASES,
            self.databases.as_deref().unwrap_or(defaults::DATABASES),
        )?;
        let users = normalize_list(
            field::USERS,
            self.users.as_deref().unwrap_or(defaults::USERS),
        )?;
        let source = self.resolve_source(conn_type)?;
        let method = parse_method(self.method.as_deref().unwrap_or(defaults::METHOD))?;

        Ok(Rule {
            conn_type,
            databases,
            users,
            source,
            method,
            options: self.options.as_deref().and_then(collapse_whitespace),
            comment: self.comment.as_deref().and_then(comment_text),
        })
    }

    /// Returns `true` if the comment is set but empty, which asks for an
    /// existing comment to be removed.
    #[must_use]
    pub fn clears_comment(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|c| comment_text(c).is_none())
    }

    fn resolve_source(&self, conn_type: ConnType) -> Result<Option<Source>, RuleError> {
        if conn_type.is_local() {
            if let Some(ref address) = self.address {
                return Err(RuleError::invalid(
                    field::ADDRESS,
                    address,
                    "not allowed for local connections",
                ));
            }
            if let Some(ref netmask) = self.netmask {
                return Err(RuleError::invalid(
                    field::NETMASK,
                    netmask,
                    "not allowed for local connections",
                ));
            }
            return Ok(None);
        }

        let address = self.address.as_deref().unwrap_or(defaults::ADDRESS);
        Source::parse(address, self.netmask.as_deref()).map(Some)
    }
}

/// Normalizes a field value for comparison between two specs.
fn canonical(name: &str, value: &str) -> String {
    match name {
        field::CONTYPE | field::METHOD => value.trim().to_lowercase(),
        field::DATABASES | field::USERS => value
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(","),
        field::ADDRESS => Source::parse(value, None)
            .map_or_else(|_| value.trim().to_string(), |source| source.to_string()),
        field::NETMASK => value
            .trim()
            .parse::<IpAddr>()
            .map_or_else(|_| value.trim().to_string(), |mask| mask.to_string()),
        _ => value.trim().to_string(),
    }
}

/// Comment text without the leading `#`, or `None` if nothing remains.
fn comment_text(value: &str) -> Option<String> {
    collapse_whitespace(value.trim().trim_start_matches('#'))
}

fn collapse_whitespace(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Everything one reconciliation pass needs besides the current file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// Default state for entries that do not set their own
    pub state: RuleState,

    /// Replace the whole file with the rules of this request
    pub overwrite: bool,

    /// How top-level fields interact with `rules` entries
    pub rules_behavior: RulesBehavior,

    /// Top-level fields: the single rule, or custom defaults for `rules`
    pub rule: RuleSpec,

    /// Explicit rule entries; `None` selects the single-rule form
    pub rules: Option<Vec<RuleSpec>>,
}

impl ReconcileRequest {
    /// Creates a single-rule request.
    #[must_use]
    pub fn single(rule: RuleSpec) -> Self {
        Self {
            rule,
            ..Self::default()
        }
    }

    /// Creates a request for a list of rule entries.
    #[must_use]
    pub fn list(rules: Vec<RuleSpec>) -> Self {
        Self {
            rules: Some(rules),
            ..Self::default()
        }
    }

    /// Sets the default state.
    #[must_use]
    pub const fn with_state(mut self, state: RuleState) -> Self {
        self.state = state;
        self
    }

    /// Enables or disables overwrite.
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the rules behavior.
    #[must_use]
    pub const fn with_rules_behavior(mut self, behavior: RulesBehavior) -> Self {
        self.rules_behavior = behavior;
        self
    }

    /// Sets the top-level rule fields.
    #[must_use]
    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.rule = rule;
        self
    }

    /// Returns `true` if entries come from an explicit `rules` list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        self.rules.is_some()
    }

    /// Returns the entries to process, in submission order.
    #[must_use]
    pub fn entries(&self) -> Vec<&RuleSpec> {
        self.rules
            .as_ref()
            .map_or_else(|| vec![&self.rule], |rules| rules.iter().collect())
    }
}
