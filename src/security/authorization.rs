//! Role-based authorization for mutating methods.
//!
//! Safe methods are never guarded; config validation refuses them. A request
//! that no rule covers passes untouched.

use std::collections::HashSet;

use axum::http::Method;

use crate::governance::{Decision, Identity, PipelineState, Rejection, RequestContext, Stage};
use crate::routing::PathScope;

pub const LOGIN_REQUIRED: &str = "Login required";
pub const INSUFFICIENT_ROLE: &str = "Insufficient role";

#[derive(Debug, Clone)]
pub struct AuthorizationRule {
    pub scope: PathScope,
    pub methods: HashSet<Method>,
    pub roles: HashSet<String>,
}

impl AuthorizationRule {
    pub fn new<M, R>(scope: PathScope, methods: M, roles: R) -> Self
    where
        M: IntoIterator<Item = Method>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            scope,
            methods: methods.into_iter().collect(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    fn guards(&self, path: &str, method: &Method) -> bool {
        self.methods.contains(method) && self.scope.contains(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    rules: Vec<AuthorizationRule>,
}

impl RoleAuthorizer {
    pub fn new(rules: Vec<AuthorizationRule>) -> Self {
        Self { rules }
    }

    pub fn evaluate_for(&self, path: &str, method: &Method, identity: Option<&Identity>) -> Decision {
        let Some(rule) = self.rules.iter().find(|r| r.guards(path, method)) else {
            return Decision::Continue;
        };

        let identity = match identity {
            Some(identity) if identity.is_authenticated => identity,
            _ => return Decision::Reject(Rejection::forbidden(LOGIN_REQUIRED)),
        };

        match identity.role.as_deref() {
            Some(role) if rule.roles.contains(role) => Decision::Continue,
            _ => Decision::Reject(Rejection::forbidden(INSUFFICIENT_ROLE)),
        }
    }
}

impl Stage for RoleAuthorizer {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn checkpoint(&self) -> PipelineState {
        PipelineState::Authorized
    }

    fn evaluate(&self, ctx: &RequestContext) -> Decision {
        self.evaluate_for(&ctx.path, &ctx.method, ctx.identity.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> RoleAuthorizer {
        RoleAuthorizer::new(vec![AuthorizationRule::new(
            PathScope::from_config(&["/api/messages*"]),
            [Method::PUT, Method::PATCH, Method::DELETE],
            ["admin", "moderator"],
        )])
    }

    fn rejection_message(decision: Decision) -> String {
        match decision {
            Decision::Reject(r) => r.message,
            Decision::Continue => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_guest_cannot_delete() {
        let guest = Identity::authenticated("bob", "guest");
        let decision = authorizer().evaluate_for("/api/messages/5", &Method::DELETE, Some(&guest));
        assert_eq!(rejection_message(decision), INSUFFICIENT_ROLE);
    }

    #[test]
    fn test_admin_can_delete() {
        let admin = Identity::authenticated("alice", "admin");
        let decision = authorizer().evaluate_for("/api/messages/5", &Method::DELETE, Some(&admin));
        assert!(decision.is_continue());
    }

    #[test]
    fn test_unauthenticated_always_needs_login() {
        let authz = authorizer();
        let pretender = Identity {
            is_authenticated: false,
            username: None,
            role: Some("admin".into()),
        };

        for identity in [None, Some(&pretender)] {
            let decision = authz.evaluate_for("/api/messages/5", &Method::PATCH, identity);
            assert_eq!(rejection_message(decision), LOGIN_REQUIRED);
        }
    }

    #[test]
    fn test_missing_role_is_insufficient() {
        let identity = Identity {
            is_authenticated: true,
            username: Some("carol".into()),
            role: None,
        };
        let decision = authorizer().evaluate_for("/api/messages/5", &Method::PUT, Some(&identity));
        assert_eq!(rejection_message(decision), INSUFFICIENT_ROLE);
    }

    #[test]
    fn test_unguarded_method_or_path_passes() {
        let authz = authorizer();
        assert!(authz.evaluate_for("/api/messages/5", &Method::GET, None).is_continue());
        assert!(authz.evaluate_for("/api/messages/", &Method::POST, None).is_continue());
        assert!(authz.evaluate_for("/api/conversations/1", &Method::DELETE, None).is_continue());
    }
}
