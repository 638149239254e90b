//! Role-based access restriction.

use std::collections::HashSet;

use crate::http::request::Principal;

pub const ROLE_DENIED_REASON: &str = "You do not have permission to access this resource.";

/// Checks authenticated principals against a set of allowed roles.
///
/// Anonymous requests are not role-checked and pass through.
#[derive(Debug, Clone)]
pub struct RoleAuthorizer {
    allowed: HashSet<String>,
}

impl RoleAuthorizer {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, principal: Option<&Principal>) -> bool {
        match principal {
            Some(user) => self.allowed.contains(&user.role),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> RoleAuthorizer {
        RoleAuthorizer::new(["admin", "moderator"])
    }

    #[test]
    fn test_role_membership() {
        let auth = authorizer();
        assert!(!auth.allows(Some(&Principal::new("g", "guest"))));
        assert!(auth.allows(Some(&Principal::new("a", "admin"))));
        assert!(auth.allows(Some(&Principal::new("m", "moderator"))));
    }

    #[test]
    fn test_role_match_is_exact() {
        let auth = authorizer();
        assert!(!auth.allows(Some(&Principal::new("a", "Admin"))));
        assert!(!auth.allows(Some(&Principal::new("a", ""))));
    }

    #[test]
    fn test_anonymous_passes() {
        assert!(authorizer().allows(None));
    }
}
