//! Rule model for `pg_hba.conf` entries.
//!
//! A [`Rule`] is a fully resolved entry: every field has a concrete value.
//! Rules are identified by [`RuleIdentity`] when the reconciler looks for an
//! existing rule to replace or remove.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::Serialize;

use super::defaults;
use super::error::{RuleError, field};

/// Connection type of a rule (the first column of a `pg_hba.conf` line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnType {
    /// Unix-domain socket connections.
    Local,
    /// TCP/IP connections, with or without SSL.
    Host,
    /// TCP/IP connections using SSL.
    HostSsl,
    /// TCP/IP connections not using SSL.
    HostNoSsl,
    /// TCP/IP connections using GSSAPI encryption.
    HostGssEnc,
    /// TCP/IP connections not using GSSAPI encryption.
    HostNoGssEnc,
}

impl ConnType {
    /// Returns the keyword used in `pg_hba.conf`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Host => "host",
            Self::HostSsl => "hostssl",
            Self::HostNoSsl => "hostnossl",
            Self::HostGssEnc => "hostgssenc",
            Self::HostNoGssEnc => "hostnogssenc",
        }
    }

    /// Returns `true` for Unix-socket rules, which carry no address.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for ConnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "host" => Ok(Self::Host),
            "hostssl" => Ok(Self::HostSsl),
            "hostnossl" => Ok(Self::HostNoSsl),
            "hostgssenc" => Ok(Self::HostGssEnc),
            "hostnogssenc" => Ok(Self::HostNoGssEnc),
            _ => Err(RuleError::invalid(
                field::CONTYPE,
                s,
                "expected local, host, hostssl, hostnossl, hostgssenc, or hostnogssenc",
            )),
        }
    }
}

/// Client address of a non-local rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// An IP network in CIDR notation (plain addresses become host networks).
    Network(IpNet),
    /// A plain IP address with a separate netmask column.
    Masked {
        /// The IP address
        address: IpAddr,
        /// The netmask
        netmask: IpAddr,
    },
    /// A keyword (`all`, `samehost`, `samenet`) or a host name.
    Named(String),
}

impl Source {
    /// Parses an address and optional netmask into a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, if a netmask accompanies a
    /// CIDR address or a non-IP address, or if either part is malformed.
    pub fn parse(address: &str, netmask: Option<&str>) -> Result<Self, RuleError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(RuleError::invalid(field::ADDRESS, address, "must not be empty"));
        }

        match netmask.map(str::trim) {
            Some(netmask) => Self::parse_masked(address, netmask),
            None => Self::parse_unmasked(address),
        }
    }

    fn parse_masked(address: &str, netmask: &str) -> Result<Self, RuleError> {
        if address.contains('/') {
            return Err(mutually_exclusive_netmask(address));
        }

        let ip = address.parse::<IpAddr>().map_err(|_| {
            RuleError::invalid(field::ADDRESS, address, "a netmask requires a plain IP address")
        })?;
        let mask = netmask
            .parse::<IpAddr>()
            .map_err(|_| RuleError::invalid(field::NETMASK, netmask, "not an IP address"))?;

        if ip.is_ipv4() != mask.is_ipv4() {
            return Err(RuleError::invalid(
                field::NETMASK,
                netmask,
                "address family does not match the address",
            ));
        }

        ipnet::ip_mask_to_prefix(mask)
            .map_err(|_| RuleError::invalid(field::NETMASK, netmask, "not a contiguous netmask"))?;

        Ok(Self::Masked {
            address: ip,
            netmask: mask,
        })
    }

    fn parse_unmasked(address: &str) -> Result<Self, RuleError> {
        if let Ok(net) = address.parse::<IpNet>() {
            return Ok(Self::Network(net));
        }

        if let Ok(ip) = address.parse::<IpAddr>() {
            let prefix = if ip.is_ipv4() { 32 } else { 128 };
            return IpNet::new(ip, prefix)
                .map(Self::Network)
                .map_err(|e| RuleError::invalid(field::ADDRESS, address, e.to_string()));
        }

        if address.contains('/') {
            return Err(RuleError::invalid(
                field::ADDRESS,
                address,
                "not a valid CIDR network",
            ));
        }

        Ok(Self::Named(address.to_string()))
    }

    /// Returns the address column text (network, IP, keyword or host name).
    #[must_use]
    pub fn address(&self) -> String {
        match self {
            Self::Network(net) => net.to_string(),
            Self::Masked { address, .. } => address.to_string(),
            Self::Named(name) => name.clone(),
        }
    }

    /// Returns the form used to compare sources.
    ///
    /// An address with a netmask compares equal to the same network written
    /// in CIDR notation.
    #[must_use]
    pub fn key(&self) -> SourceKey<'_> {
        match self {
            Self::Network(net) => SourceKey::Network(*net),
            Self::Masked { address, netmask } => ipnet::ip_mask_to_prefix(*netmask)
                .ok()
                .and_then(|prefix| IpNet::new(*address, prefix).ok())
                .map_or(
                    SourceKey::Masked {
                        address: *address,
                        netmask: *netmask,
                    },
                    SourceKey::Network,
                ),
            Self::Named(name) => SourceKey::Named(name),
        }
    }

    /// Returns the netmask column text, if this source has one.
    #[must_use]
    pub fn netmask(&self) -> Option<String> {
        match self {
            Self::Masked { netmask, .. } => Some(netmask.to_string()),
            Self::Network(_) | Self::Named(_) => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(net) => write!(f, "{net}"),
            Self::Masked { address, netmask } => write!(f, "{address} {netmask}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Comparable form of a [`Source`], see [`Source::key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey<'a> {
    /// An IP network, however it was written
    Network(IpNet),
    /// An address and netmask that do not form a network
    Masked {
        /// The IP address
        address: IpAddr,
        /// The netmask
        netmask: IpAddr,
    },
    /// A keyword or host name
    Named(&'a str),
}

pub(crate) fn mutually_exclusive_netmask(address: &str) -> RuleError {
    RuleError::MutuallyExclusive {
        first: field::ADDRESS,
        second: field::NETMASK,
        reason: format!("address '{address}' is already in CIDR notation"),
    }
}

/// Fields that locate a rule for replacement or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleIdentity<'a> {
    /// Connection type
    pub conn_type: ConnType,
    /// Normalized database list
    pub databases: &'a str,
    /// Normalized user list
    pub users: &'a str,
    /// Client address, absent for local rules
    pub source: Option<SourceKey<'a>>,
}

/// A fully resolved `pg_hba.conf` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Connection type
    pub conn_type: ConnType,
    /// Comma-joined database list
    pub databases: String,
    /// Comma-joined user list
    pub users: String,
    /// Client address (`None` for local rules)
    pub source: Option<Source>,
    /// Authentication method
    pub method: String,
    /// Authentication options (`name=value` pairs)
    pub options: Option<String>,
    /// Inline comment, without the leading `#`
    pub comment: Option<String>,
}

impl Rule {
    /// Creates a rule with the built-in database, user, address and method.
    #[must_use]
    pub fn new(conn_type: ConnType) -> Self {
        let source = (!conn_type.is_local()).then(|| Source::Named(defaults::ADDRESS.to_string()));
        Self {
            conn_type,
            databases: defaults::DATABASES.to_string(),
            users: defaults::USERS.to_string(),
            source,
            method: defaults::METHOD.to_string(),
            options: None,
            comment: None,
        }
    }

    /// Sets the database list.
    #[must_use]
    pub fn with_databases(mut self, databases: impl Into<String>) -> Self {
        self.databases = databases.into();
        self
    }

    /// Sets the user list.
    #[must_use]
    pub fn with_users(mut self, users: impl Into<String>) -> Self {
        self.users = users.into();
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the authentication options.
    #[must_use]
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Sets the inline comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the identity used to match this rule against others.
    #[must_use]
    pub fn identity(&self) -> RuleIdentity<'_> {
        RuleIdentity {
            conn_type: self.conn_type,
            databases: &self.databases,
            users: &self.users,
            source: self.source.as_ref().map(Source::key),
        }
    }

    /// Returns the serialized form with abbreviated keys.
    #[must_use]
    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            conn_type: self.conn_type.as_str().to_string(),
            db: self.databases.clone(),
            usr: self.users.clone(),
            src: self.source.as_ref().map(Source::address),
            netmask: self.source.as_ref().and_then(Source::netmask),
            method: self.method.clone(),
            options: self.options.clone(),
            comment: self.comment.clone(),
        }
    }
}

/// Renders the canonical line: `type db usr [src [netmask]] method [options] [# comment]`.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.conn_type, self.databases, self.users)?;
        if let Some(ref source) = self.source {
            write!(f, " {source}")?;
        }
        write!(f, " {}", self.method)?;
        if let Some(ref options) = self.options {
            write!(f, " {options}")?;
        }
        if let Some(ref comment) = self.comment {
            write!(f, " # {comment}")?;
        }
        Ok(())
    }
}

/// Serialized rule with abbreviated keys, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRecord {
    /// Connection type
    #[serde(rename = "type")]
    pub conn_type: String,
    /// Database list
    pub db: String,
    /// User list
    pub usr: String,
    /// Client address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Netmask
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
    /// Authentication method
    pub method: String,
    /// Authentication options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    /// Inline comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Normalizes a comma-joined list by trimming each element.
///
/// # Errors
///
/// Returns an error if the list or any of its elements is empty.
pub fn normalize_list(field: &'static str, value: &str) -> Result<String, RuleError> {
    let elements: Vec<&str> = value.split(',').map(str::trim).collect();
    if elements.iter().any(|e| e.is_empty()) {
        return Err(RuleError::invalid(field, value, "list contains an empty element"));
    }
    Ok(elements.join(","))
}

/// Validates an authentication method name.
///
/// # Errors
///
/// Returns an error if the method is not a known authentication method.
pub fn parse_method(value: &str) -> Result<String, RuleError> {
    let method = value.trim().to_lowercase();
    if defaults::METHODS.contains(&method.as_str()) {
        Ok(method)
    } else {
        Err(RuleError::invalid(
            field::METHOD,
            value,
            "unknown authentication method",
        ))
    }
}
