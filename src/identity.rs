//! Session identity as reported by the external auth provider.

/// Who the current session belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    pub is_authenticated: bool,
    pub account_id: Option<String>,
}

impl IdentityContext {
    /// Anonymous session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed-in session for `account_id`.
    pub fn authenticated(account_id: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            account_id: Some(account_id.into()),
        }
    }

    /// Account to sync against, if signed in with a usable id.
    pub fn remote_account(&self) -> Option<&str> {
        if !self.is_authenticated {
            return None;
        }
        self.account_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// One message from the identity provider stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    /// Whether the provider has finished initializing
    pub ready: bool,
    pub context: IdentityContext,
}

impl IdentityUpdate {
    pub fn ready(context: IdentityContext) -> Self {
        Self {
            ready: true,
            context,
        }
    }
}
