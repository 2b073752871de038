//! Built-in values for rule fields the caller leaves unset.

/// Database list used when none is given.
pub const DATABASES: &str = "all";

/// User list used when none is given.
pub const USERS: &str = "all";

/// Client address used for non-local rules when none is given.
pub const ADDRESS: &str = "samehost";

/// Authentication method used when none is given.
pub const METHOD: &str = "md5";

/// Authentication methods accepted in a rule.
pub const METHODS: &[&str] = &[
    "trust",
    "reject",
    "md5",
    "password",
    "scram-sha-256",
    "gss",
    "sspi",
    "ident",
    "peer",
    "ldap",
    "radius",
    "cert",
    "pam",
    "bsd",
];
