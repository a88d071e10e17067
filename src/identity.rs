//! Identity boundary.
//!
//! Sign-in is modeled as an external provider behind a trait, even
//! though the terminal app backs it with the locally configured
//! username: score saving refuses to proceed without an identity, and
//! everything that renders a user goes through
//! [`IdentityApi::display_name`], so swapping in a real provider
//! touches nothing else.

use async_trait::async_trait;

use crate::catalog::CatalogError;

/// Trait for the identity provider.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// The signed-in user's id, or `None` when nobody is signed in.
    fn current_user_id(&self) -> Option<String>;

    /// Human-readable name for a user id. Remote in the original, hence
    /// fallible and async here.
    async fn display_name(&self, user_id: &str) -> Result<String, CatalogError>;
}

/// Identity backed by the config file's `[identity] username` entry.
pub struct ConfigIdentity {
    username: Option<String>,
}

impl ConfigIdentity {
    pub fn new(username: Option<String>) -> Self {
        Self {
            username: username.filter(|u| !u.trim().is_empty()),
        }
    }
}

#[async_trait]
impl IdentityApi for ConfigIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.username.clone()
    }

    async fn display_name(&self, user_id: &str) -> Result<String, CatalogError> {
        // Locally, the username is both the id and the display name.
        Ok(user_id.to_string())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;

    /// An identity that is always signed in as the given user.
    pub struct SignedIn(pub &'static str);

    #[async_trait]
    impl IdentityApi for SignedIn {
        fn current_user_id(&self) -> Option<String> {
            Some(self.0.to_string())
        }

        async fn display_name(&self, user_id: &str) -> Result<String, CatalogError> {
            Ok(user_id.to_string())
        }
    }

    /// An identity that is never signed in.
    pub struct SignedOut;

    #[async_trait]
    impl IdentityApi for SignedOut {
        fn current_user_id(&self) -> Option<String> {
            None
        }

        async fn display_name(&self, _user_id: &str) -> Result<String, CatalogError> {
            Err(CatalogError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_username_counts_as_signed_out() {
        assert!(ConfigIdentity::new(Some("  ".to_string())).current_user_id().is_none());
        assert!(ConfigIdentity::new(None).current_user_id().is_none());
    }

    #[tokio::test]
    async fn test_config_identity_display_name() {
        let identity = ConfigIdentity::new(Some("alice".to_string()));
        assert_eq!(identity.current_user_id().as_deref(), Some("alice"));
        assert_eq!(identity.display_name("alice").await.unwrap(), "alice");
    }
}
