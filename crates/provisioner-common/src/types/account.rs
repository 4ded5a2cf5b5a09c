//! People, usernames and finished accounts.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;

use super::username::Username;

/// Longest first or last name the directory accepts.
pub const MAX_NAME_LENGTH: usize = 60;
/// Shortest password the directory accepts.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Longest password the directory accepts.
pub const MAX_PASSWORD_LENGTH: usize = 100;

/// Everything needed to provision one account.
///
/// Immutable once handed to the workflow.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct AccountRequest {
    /// First name
    #[serde(rename = "firstname")]
    #[builder(into)]
    pub first_name: SmolStr,
    /// Last name
    #[serde(rename = "lastname")]
    #[builder(into)]
    pub last_name: SmolStr,
    /// Optional custom field fed to the username patterns on the server
    #[serde(
        rename = "customfield",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[builder(into)]
    pub custom_field: Option<SmolStr>,
    /// Initial password for the account
    #[builder(into)]
    pub password: SmolStr,
    /// Further person attributes (e.g. `studentId`) that server-side username
    /// patterns may refer to. Sent with `suggest` only.
    #[serde(flatten, default)]
    #[builder(default)]
    pub extra_fields: BTreeMap<SmolStr, SmolStr>,
}

/// Local validation failures for an [`AccountRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum ValidationError {
    /// A mandatory name field is empty
    #[error("{0} is empty")]
    EmptyName(&'static str),
    /// A name is longer than the directory allows
    #[error("{field} is longer than 60 characters")]
    NameTooLong {
        /// Which field
        field: &'static str,
    },
    /// Password below the minimum length
    #[error("password should have 8 or more characters")]
    PasswordTooShort,
    /// Password above the maximum length
    #[error("password should have at most 100 characters")]
    PasswordTooLong,
    /// A username was chosen that is not part of the suggestion set
    #[error("{0} is not one of the suggested usernames")]
    #[diagnostic(help("pick one of the usernames returned by the latest suggest call"))]
    NotSuggested(Username),
}

impl AccountRequest {
    /// Both mandatory name fields are present.
    pub fn has_names(&self) -> bool {
        !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty()
    }

    /// Custom field, if it carries any text.
    pub fn custom_field(&self) -> Option<&str> {
        self.custom_field.as_deref().filter(|c| !c.is_empty())
    }

    /// Check the request against the directory's field limits.
    ///
    /// Empty names are reported first so callers can tell a row that should
    /// be skipped from one that is malformed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::EmptyName("firstname"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::EmptyName("lastname"));
        }
        if self.first_name.chars().count() > MAX_NAME_LENGTH {
            return Err(ValidationError::NameTooLong { field: "firstname" });
        }
        if self.last_name.chars().count() > MAX_NAME_LENGTH {
            return Err(ValidationError::NameTooLong { field: "lastname" });
        }
        let password_len = self.password.chars().count();
        if password_len < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort);
        }
        if password_len > MAX_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooLong);
        }
        Ok(())
    }
}

impl fmt::Debug for AccountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("custom_field", &self.custom_field)
            .field("extra_fields", &self.extra_fields)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A provisioned directory account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Username without the domain
    pub username: Username,
    /// Directory domain the account lives in
    pub domain: SmolStr,
}

impl Account {
    /// `username@domain`
    pub fn email(&self) -> String {
        format!("{}@{}", self.username, self.domain)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> AccountRequest {
        AccountRequest::builder()
            .first_name("Ada")
            .last_name("Lovelace")
            .password("eightchar")
            .build()
    }

    #[test]
    fn valid_request_passes() {
        assert_eq!(ada().validate(), Ok(()));
        assert!(ada().has_names());
    }

    #[test]
    fn empty_names_come_first() {
        let mut req = ada();
        req.last_name = SmolStr::new_static("  ");
        req.password = SmolStr::new_static("x");
        assert_eq!(req.validate(), Err(ValidationError::EmptyName("lastname")));
        assert!(!req.has_names());
    }

    #[test]
    fn password_bounds() {
        let mut req = ada();
        req.password = SmolStr::new_static("1234567");
        assert_eq!(req.validate(), Err(ValidationError::PasswordTooShort));
        req.password = SmolStr::new("p".repeat(MAX_PASSWORD_LENGTH + 1));
        assert_eq!(req.validate(), Err(ValidationError::PasswordTooLong));
    }

    #[test]
    fn wire_shape_omits_missing_custom_field() {
        let json = serde_json::to_value(ada()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"firstname": "Ada", "lastname": "Lovelace", "password": "eightchar"})
        );
        let with_custom = AccountRequest::builder()
            .first_name("Ada")
            .last_name("Lovelace")
            .custom_field("1815")
            .password("eightchar")
            .build();
        assert_eq!(with_custom.custom_field(), Some("1815"));
    }

    #[test]
    fn debug_redacts_password() {
        let dbg = format!("{:?}", ada());
        assert!(!dbg.contains("eightchar"));
        assert!(dbg.contains("Lovelace"));
    }

    #[test]
    fn account_email() {
        let account = Account {
            username: Username::new_static("ada.lovelace"),
            domain: SmolStr::new_static("example.com"),
        };
        assert_eq!(account.email(), "ada.lovelace@example.com");
        assert_eq!(account.to_string(), account.email());
    }
}
