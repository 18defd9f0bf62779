use serde::{Deserialize, Serialize};

use super::{require_text, Validate};
use crate::error::ValidationError;

/// A username/password pair. Comparison happens store-side; this type only carries it there.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(alias = "username")]
    pub user_name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self { user_name: user_name.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("user_name", &self.user_name).field("password", &"<redacted>").finish()
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("userName", &self.user_name)?;
        if self.password.is_empty() {
            return Err(ValidationError::new("password", "must not be empty"));
        }
        Ok(())
    }
}
