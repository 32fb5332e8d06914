//! Common types for host operations.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Highest mode accepted: permission bits plus setuid, setgid and sticky.
const MAX_MODE: u32 = 0o7777;

/// Unix permission bits parsed from an octal string such as `"0644"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    /// Wrap raw mode bits, keeping only the permission portion.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & MAX_MODE)
    }

    /// Raw mode bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Parse an octal permission string.
    ///
    /// Accepts one to four octal digits after optional leading zeros
    /// (`"644"`, `"0644"`, `"00644"`, `"4755"`).
    pub fn parse(value: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidMode {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("empty permission string"));
        }
        if !value.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(invalid("not an octal number"));
        }

        let digits = value.trim_start_matches('0');
        if digits.len() > 4 {
            return Err(invalid("more than four octal digits"));
        }

        let bits = if digits.is_empty() {
            0
        } else {
            u32::from_str_radix(digits, 8).map_err(|e| invalid(&e.to_string()))?
        };

        if bits > MAX_MODE {
            return Err(invalid("mode exceeds 07777"));
        }

        Ok(Self(bits))
    }
}

impl FromStr for FileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// Numeric owner and group for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}
