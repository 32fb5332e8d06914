//! Typed values for user fields that are declared but not applied yet
//!
//! `sudo`, `ssh-authorized-keys` and `github` are carried through the
//! configuration so documents written for a later release keep parsing, but
//! nothing provisions them. They are still validated on load so a typo fails
//! at startup instead of silently sitting in the document.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Key types accepted in `ssh-authorized-keys`
pub const SSH_KEY_ALGORITHMS: &[&str] = &[
    "ssh-rsa",
    "ssh-dss",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
    "ssh-rsa-cert-v01@openssh.com",
    "ssh-dss-cert-v01@openssh.com",
    "ssh-ed25519-cert-v01@openssh.com",
    "ecdsa-sha2-nistp256-cert-v01@openssh.com",
    "ecdsa-sha2-nistp384-cert-v01@openssh.com",
    "ecdsa-sha2-nistp521-cert-v01@openssh.com",
    "sk-ssh-ed25519-cert-v01@openssh.com",
    "sk-ecdsa-sha2-nistp256-cert-v01@openssh.com",
];

/// GitHub caps usernames at 39 characters
const GITHUB_HANDLE_MAX: usize = 39;

// Every key blob starts with a four-byte length prefix, so the base64 always opens with "AAAA".
static SSH_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<alg>\S+)\s+(?P<data>AAAA[A-Za-z0-9+/]*={0,3})(?:\s+(?P<comment>.*))?$")
        .expect("valid SSH key regex")
});

static GITHUB_HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*$").expect("valid handle regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("sudo rule must not be empty")]
    EmptySudoRule,

    #[error("sudo rule {0:?} must be a single line")]
    MultilineSudoRule(String),

    #[error("invalid SSH public key {0:?}: expected '[options] <type> <base64> [comment]'")]
    SshKeyFormat(String),

    #[error("unsupported SSH key type {0:?}")]
    SshKeyAlgorithm(String),

    #[error("invalid GitHub handle {0:?}")]
    GitHubHandle(String),
}

// ============================================================================
// Sudo rules
// ============================================================================

/// One sudoers rule, e.g. `ALL=(ALL) NOPASSWD:ALL`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SudoRule(String);

impl SudoRule {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SudoRule {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(FieldError::EmptySudoRule);
        }
        if trimmed.contains('\n') {
            return Err(FieldError::MultilineSudoRule(value));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<SudoRule> for String {
    fn from(rule: SudoRule) -> Self {
        rule.0
    }
}

impl fmt::Display for SudoRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SSH keys
// ============================================================================

/// An `authorized_keys` line: `[options] <type> <base64> [comment]`
///
/// Options such as `no-pty` or `command="..."` and certificate key types are
/// accepted because sshd accepts them in the same file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SshPublicKey {
    line: String,
    options: Option<String>,
    algorithm: String,
    comment: Option<String>,
}

impl SshPublicKey {
    pub fn options(&self) -> Option<&str> {
        self.options.as_deref()
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl TryFrom<String> for SshPublicKey {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let line = value.trim();
        let (options, key) = split_options(line);
        let caps = SSH_KEY_RE
            .captures(key)
            .ok_or_else(|| FieldError::SshKeyFormat(value.clone()))?;

        let algorithm = &caps["alg"];
        if !SSH_KEY_ALGORITHMS.contains(&algorithm) {
            return Err(FieldError::SshKeyAlgorithm(algorithm.to_string()));
        }

        Ok(Self {
            line: line.to_string(),
            options: options.map(str::to_string),
            algorithm: algorithm.to_string(),
            comment: caps
                .name("comment")
                .map(|c| c.as_str().trim().to_string())
                .filter(|c| !c.is_empty()),
        })
    }
}

/// Separate a leading options field from the key itself.
///
/// The options field ends at the first whitespace outside double quotes. It
/// is only split off when the line does not already start with a known key
/// type and what follows it looks like a key.
fn split_options(line: &str) -> (Option<&str>, &str) {
    let first = line.split_whitespace().next().unwrap_or_default();
    if SSH_KEY_ALGORITHMS.contains(&first) {
        return (None, line);
    }

    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                let rest = line[i..].trim_start();
                return if SSH_KEY_RE.is_match(rest) {
                    (Some(&line[..i]), rest)
                } else {
                    (None, line)
                };
            }
            _ => {}
        }
    }
    (None, line)
}

impl From<SshPublicKey> for String {
    fn from(key: SshPublicKey) -> Self {
        key.line
    }
}

// ============================================================================
// GitHub handle
// ============================================================================

/// A GitHub username, e.g. `octocat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitHubHandle(String);

impl GitHubHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GitHubHandle {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() > GITHUB_HANDLE_MAX || !GITHUB_HANDLE_RE.is_match(&value) {
            return Err(FieldError::GitHubHandle(value));
        }
        Ok(Self(value))
    }
}

impl From<GitHubHandle> for String {
    fn from(handle: GitHubHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for GitHubHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `github: ""` and a missing key both mean "no handle"
pub fn deserialize_github<'de, D>(deserializer: D) -> Result<Option<GitHubHandle>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => GitHubHandle::try_from(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
