//! Authenticated session state.

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque bearer credential returned by a successful login.
///
/// `Debug` never prints the token itself. Only [`AuthToken::new`] builds one,
/// so a token is never blank.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken(<redacted>)")
    }
}

impl AuthToken {
    /// Returns `None` for blank tokens; a blank token is the same as no token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

/// The persisted user session.
///
/// A session with no token is unauthenticated: the feed and story submission
/// must not be attempted with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "blank_token_as_none")]
    pub token: Option<AuthToken>,
}

impl Session {
    #[must_use]
    pub fn authenticated(
        email: impl Into<String>,
        name: impl Into<String>,
        token: AuthToken,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            token: Some(token),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

fn blank_token_as_none<'de, D>(deserializer: D) -> Result<Option<AuthToken>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(AuthToken::new))
}
