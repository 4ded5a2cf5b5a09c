//! Validated directory usernames.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Longest username the directory accepts, without the domain part.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// A directory username, without the `@domain` part.
///
/// Guaranteed non-empty, at most [`MAX_USERNAME_LENGTH`] characters, and free
/// of whitespace and `@`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "SmolStr", into = "SmolStr")]
pub struct Username(SmolStr);

/// Reasons a string is not a valid [`Username`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum UsernameError {
    /// Empty input
    #[error("username is empty")]
    Empty,
    /// Longer than the directory allows
    #[error("username is {0} characters long, at most 64 are allowed")]
    TooLong(usize),
    /// Contains a character the directory rejects
    #[error("username contains invalid character {0:?}")]
    #[diagnostic(help("usernames are given without the domain part"))]
    InvalidCharacter(char),
}

impl Username {
    /// Validate and wrap a username.
    pub fn new(username: impl AsRef<str>) -> Result<Self, UsernameError> {
        let username = username.as_ref();
        if username.is_empty() {
            return Err(UsernameError::Empty);
        }
        let len = username.chars().count();
        if len > MAX_USERNAME_LENGTH {
            return Err(UsernameError::TooLong(len));
        }
        if let Some(c) = username.chars().find(|c| c.is_whitespace() || *c == '@') {
            return Err(UsernameError::InvalidCharacter(c));
        }
        Ok(Self(SmolStr::new(username)))
    }

    /// Wrap a `'static` username that is known to be valid.
    ///
    /// Panics if it is not; intended for constants and tests.
    pub fn new_static(username: &'static str) -> Self {
        match Self::new(username) {
            Ok(username) => username,
            Err(e) => panic!("invalid static username {username:?}: {e}"),
        }
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<SmolStr> for Username {
    type Error = UsernameError;

    fn try_from(value: SmolStr) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for SmolStr {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Deref for Username {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Username {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Username {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Username({:?})", self.0.as_str())
    }
}
