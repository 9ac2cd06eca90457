use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::auth::AuthUser;

/// Role
///
/// The fixed capability tier assigned 1:1 to every user account. The persisted
/// `role` column is the single source of truth; the `is_staff` and `is_superuser`
/// flags on the user record are always derived from it (see `staff_flags`) and
/// rewritten together with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

impl Role {
    /// The canonical lowercase label stored in the database and shown in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// parse_lossy
    ///
    /// Decodes a stored role label. A value that matches none of the three tiers
    /// is treated as the lowest privilege and logged as a data inconsistency
    /// rather than failing the request.
    pub fn parse_lossy(value: &str) -> Role {
        match value {
            "admin" => Role::Admin,
            "editor" => Role::Editor,
            "viewer" => Role::Viewer,
            other => {
                tracing::warn!(role = %other, "unknown role label in storage, treating as viewer");
                Role::Viewer
            }
        }
    }

    /// staff_flags
    ///
    /// Pure derivation of the two privilege flags from the role:
    /// `is_staff` for editor and admin, `is_superuser` for admin only.
    /// Every write path that touches the role persists the result of this
    /// function in the same statement as the role itself.
    pub fn staff_flags(&self) -> (bool, bool) {
        let is_staff = matches!(self, Role::Editor | Role::Admin);
        let is_superuser = matches!(self, Role::Admin);
        (is_staff, is_superuser)
    }
}

// Lossy conversion used by sqlx FromRow derives (`#[sqlx(try_from = "String")]`).
impl TryFrom<String> for Role {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Role::parse_lossy(&value))
    }
}

/// Capability
///
/// The effective tier of the caller behind a single request, resolved exactly once
/// from the (possibly absent) authenticated identity. Handlers query this enum
/// instead of re-checking role strings at every call site.
///
/// Containment is hierarchical: anything granted to a lower tier is granted to
/// every higher tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Anonymous,
    Viewer,
    Editor,
    Admin,
}

impl Capability {
    /// Resolves the capability for a request: `Anonymous` when no authenticated
    /// identity is present, otherwise the tier of the user's assigned role.
    pub fn of(user: Option<&AuthUser>) -> Capability {
        match user {
            None => Capability::Anonymous,
            Some(u) => match u.role {
                Role::Admin => Capability::Admin,
                Role::Editor => Capability::Editor,
                Role::Viewer => Capability::Viewer,
            },
        }
    }

    /// Post submission is open to every tier. Anonymous callers are additionally
    /// subject to the submission guard before the insert happens.
    pub fn can_submit_posts(&self) -> bool {
        true
    }

    /// Moderation (listing, bulk actions, status changes) requires editor or admin.
    pub fn can_moderate(&self) -> bool {
        matches!(self, Capability::Editor | Capability::Admin)
    }

    /// Account administration is restricted to admins.
    pub fn can_administer_users(&self) -> bool {
        matches!(self, Capability::Admin)
    }
}
