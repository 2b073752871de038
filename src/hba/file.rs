//! Line-oriented model of a `pg_hba.conf` file.
//!
//! Every line of the input is kept. Lines that are not touched by a
//! reconciliation are rendered exactly as they were read; only new or
//! modified rules are rendered in canonical form.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use super::error::{RuleError, field};
use super::request::RuleSpec;
use super::rule::{Rule, RuleIdentity, RuleRecord};

/// A whitespace-separated token; double-quoted parts may contain spaces.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:"[^"]*"|[^\s"])+"#).expect("token pattern is valid"));

/// One line of a `pg_hba.conf` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HbaLine {
    /// An authentication rule.
    Rule {
        /// The parsed rule
        rule: Rule,
        /// Original text, `None` once the rule is new or modified
        raw: Option<String>,
    },
    /// A line starting with `#`.
    Comment(String),
    /// An empty or whitespace-only line.
    Blank(String),
    /// A line that is not a recognized rule (e.g. `include` directives).
    Other(String),
}

impl HbaLine {
    /// Returns the rule on this line, if any.
    #[must_use]
    pub const fn rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule { rule, .. } => Some(rule),
            Self::Comment(_) | Self::Blank(_) | Self::Other(_) => None,
        }
    }

    /// Returns the text written back to the file for this line.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Rule { rule, raw } => raw.clone().unwrap_or_else(|| rule.to_string()),
            Self::Comment(text) | Self::Blank(text) | Self::Other(text) => text.clone(),
        }
    }
}

/// Contents of a `pg_hba.conf` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HbaFile {
    lines: Vec<HbaLine>,
}

impl HbaFile {
    /// Parses file content. Lines that fail to parse as rules are kept as
    /// [`HbaLine::Other`].
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(index, line)| parse_line(line, index + 1))
            .collect();
        Self { lines }
    }

    /// Creates a file holding only the given rules.
    #[must_use]
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            lines: rules
                .into_iter()
                .map(|rule| HbaLine::Rule { rule, raw: None })
                .collect(),
        }
    }

    /// Returns all lines in file order.
    #[must_use]
    pub fn lines(&self) -> &[HbaLine] {
        &self.lines
    }

    /// Returns the rules in file order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.lines.iter().filter_map(HbaLine::rule)
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules().count()
    }

    /// Returns the rules in serialized form.
    #[must_use]
    pub fn records(&self) -> Vec<RuleRecord> {
        self.rules().map(Rule::to_record).collect()
    }

    /// Adds a rule, or replaces the first rule with the same identity.
    ///
    /// A replacement keeps the existing comment when the new rule has none.
    /// Returns `true` if the file changed.
    pub fn upsert(&mut self, rule: Rule) -> bool {
        self.put(rule, true)
    }

    /// Like [`HbaFile::upsert`], but the new rule's comment is taken as is,
    /// so a rule without one drops the existing comment.
    pub fn replace(&mut self, rule: Rule) -> bool {
        self.put(rule, false)
    }

    fn put(&mut self, mut rule: Rule, keep_comment: bool) -> bool {
        let position = self
            .lines
            .iter()
            .position(|line| line.rule().is_some_and(|r| r.identity() == rule.identity()));

        let Some(index) = position else {
            self.lines.push(HbaLine::Rule { rule, raw: None });
            return true;
        };

        let HbaLine::Rule { rule: current, raw } = &mut self.lines[index] else {
            return false;
        };

        if keep_comment && rule.comment.is_none() {
            rule.comment.clone_from(&current.comment);
        }
        if *current == rule {
            return false;
        }

        *current = rule;
        *raw = None;
        true
    }

    /// Removes every rule with the given identity.
    ///
    /// Returns `true` if at least one rule was removed.
    pub fn remove(&mut self, identity: &RuleIdentity<'_>) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| line.rule().is_none_or(|r| r.identity() != *identity));
        self.lines.len() != before
    }

    /// Renders the file content, one line per entry with a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }
}

fn parse_line(line: &str, number: usize) -> HbaLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return HbaLine::Blank(line.to_string());
    }
    if trimmed.starts_with('#') {
        return HbaLine::Comment(line.to_string());
    }

    match parse_rule(trimmed) {
        Ok(rule) => HbaLine::Rule {
            rule,
            raw: Some(line.to_string()),
        },
        Err(e) => {
            tracing::warn!("Keeping unrecognized line {number} as is: {e}");
            HbaLine::Other(line.to_string())
        }
    }
}

/// Splits a line at the first `#` outside double quotes.
fn split_comment(line: &str) -> Result<(&str, Option<&str>), RuleError> {
    let mut quoted = false;
    for (index, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return Ok((&line[..index], Some(&line[index + 1..]))),
            _ => {}
        }
    }
    if quoted {
        return Err(RuleError::invalid(field::DATABASES, line, "unterminated quote"));
    }
    Ok((line, None))
}

/// Parses a rule line: `type database user [address [netmask]] method [options...]`.
fn parse_rule(line: &str) -> Result<Rule, RuleError> {
    let (content, comment) = split_comment(line)?;
    let tokens: Vec<&str> = TOKEN.find_iter(content).map(|m| m.as_str()).collect();
    let token = |index: usize, name: &'static str| {
        tokens
            .get(index)
            .map(|t| (*t).to_string())
            .ok_or(RuleError::missing(name))
    };

    let mut spec = RuleSpec {
        contype: Some(token(0, field::CONTYPE)?),
        databases: Some(token(1, field::DATABASES)?),
        users: Some(token(2, field::USERS)?),
        comment: comment.map(str::to_string),
        ..RuleSpec::default()
    };

    let is_local = tokens[0].eq_ignore_ascii_case("local");
    let method_index = if is_local {
        3
    } else {
        let address = token(3, field::ADDRESS)?;
        let has_netmask = !address.contains('/')
            && address.parse::<IpAddr>().is_ok()
            && tokens.get(4).is_some_and(|t| t.parse::<IpAddr>().is_ok());
        spec.address = Some(address);
        if has_netmask {
            spec.netmask = Some(token(4, field::NETMASK)?);
            5
        } else {
            4
        }
    };

    spec.method = Some(token(method_index, field::METHOD)?);
    let options = &tokens[(method_index + 1).min(tokens.len())..];
    if !options.is_empty() {
        spec.options = Some(options.join(" "));
    }

    spec.to_rule()
}
