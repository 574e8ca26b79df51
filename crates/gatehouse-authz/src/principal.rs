//! Principal capability and the subject/role providers built on it.
//!
//! # Purpose
//! Defines the narrow view of a principal the engine relies on (stable id,
//! active flag, primary role) and maps principals to policy subjects and
//! role membership.
//!
//! # Key invariants
//! - `has_role` is `true` for any queried role when the principal's primary
//!   role equals the configured superadmin role. This is the only bypass in
//!   the role layer.
//! - Nothing else about a principal is inspected.
//!
//! # Examples
//! ```rust
//! use gatehouse_authz::{BasicPrincipal, PrimaryRoleProvider, RoleProvider};
//!
//! let roles = PrimaryRoleProvider::new(Some("admin".to_string()));
//! let admin = BasicPrincipal::new("u-1", "admin");
//! let user = BasicPrincipal::new("u-2", "user");
//! assert!(roles.has_role(&admin, "auditor"));
//! assert!(!roles.has_role(&user, "auditor"));
//! ```
use serde::{Deserialize, Serialize};

/// The accessors the engine needs from a user or service identity.
pub trait Principal: Send + Sync {
    fn id(&self) -> &str;
    fn is_active(&self) -> bool;
    fn role(&self) -> &str;
}

/// Plain principal value for callers without their own identity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicPrincipal {
    pub id: String,
    pub role: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl BasicPrincipal {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl Principal for BasicPrincipal {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn role(&self) -> &str {
        &self.role
    }
}

/// Maps a principal to the identifier used as the policy subject.
pub trait SubjectProvider: Send + Sync {
    fn subject(&self, principal: &dyn Principal) -> String;
}

/// Uses the principal id as the subject.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdSubjectProvider;

impl SubjectProvider for IdSubjectProvider {
    fn subject(&self, principal: &dyn Principal) -> String {
        principal.id().to_string()
    }
}

/// Subject derived by a closure, e.g. looking up an email for the id.
impl<F> SubjectProvider for F
where
    F: Fn(&dyn Principal) -> String + Send + Sync,
{
    fn subject(&self, principal: &dyn Principal) -> String {
        self(principal)
    }
}

/// Role lookup with the superadmin override applied in one place.
pub trait RoleProvider: Send + Sync {
    fn role(&self, principal: &dyn Principal) -> String;

    fn superadmin_role(&self) -> Option<&str>;

    fn is_superadmin(&self, principal: &dyn Principal) -> bool {
        self.superadmin_role()
            .is_some_and(|superadmin| self.role(principal) == superadmin)
    }

    fn has_role(&self, principal: &dyn Principal, role: &str) -> bool {
        self.is_superadmin(principal) || self.role(principal) == role
    }
}

/// Reads the principal's primary role.
#[derive(Debug, Clone, Default)]
pub struct PrimaryRoleProvider {
    superadmin_role: Option<String>,
}

impl PrimaryRoleProvider {
    pub fn new(superadmin_role: Option<String>) -> Self {
        Self { superadmin_role }
    }
}

impl RoleProvider for PrimaryRoleProvider {
    fn role(&self, principal: &dyn Principal) -> String {
        principal.role().to_string()
    }

    fn superadmin_role(&self) -> Option<&str> {
        self.superadmin_role.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_subject_uses_principal_id() {
        let principal = BasicPrincipal::new("u-7", "user");
        assert_eq!(IdSubjectProvider.subject(&principal), "u-7");
    }

    #[test]
    fn closure_subject_provider() {
        let by_email = |principal: &dyn Principal| format!("{}@example.com", principal.id());
        let principal = BasicPrincipal::new("alice", "user");
        assert_eq!(by_email.subject(&principal), "alice@example.com");
    }

    #[test]
    fn has_role_matches_primary_role() {
        let roles = PrimaryRoleProvider::new(Some("admin".to_string()));
        let editor = BasicPrincipal::new("u-1", "editor");
        assert_eq!(roles.role(&editor), "editor");
        assert!(roles.has_role(&editor, "editor"));
        assert!(!roles.has_role(&editor, "viewer"));
        assert!(!roles.is_superadmin(&editor));
    }

    #[test]
    fn superadmin_holds_every_role() {
        let roles = PrimaryRoleProvider::new(Some("admin".to_string()));
        let admin = BasicPrincipal::new("u-1", "admin");
        assert!(roles.is_superadmin(&admin));
        assert!(roles.has_role(&admin, "anything-at-all"));
    }

    #[test]
    fn no_superadmin_configured_means_no_bypass() {
        let roles = PrimaryRoleProvider::default();
        let admin = BasicPrincipal::new("u-1", "admin");
        assert!(!roles.has_role(&admin, "editor"));
    }

    #[test]
    fn principal_defaults_to_active() {
        let principal: BasicPrincipal =
            serde_yaml::from_str("id: u-1\nrole: user\n").expect("yaml");
        assert!(principal.is_active());
        assert!(!principal.inactive().is_active());
    }
}
