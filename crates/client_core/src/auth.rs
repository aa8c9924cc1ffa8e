//! Admin gate over the hosted identity service's current-user state.
//!
//! The email comparison here only decides what the client shows. Writes must
//! still be authorized by the record store's own access rules.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user_email: Option<String>,
    pub loading: bool,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            user_email: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(email: impl Into<String>) -> Self {
        Self {
            user_email: Some(email.into()),
            loading: false,
        }
    }
}

pub trait AuthGate: Send + Sync {
    fn state(&self) -> AuthState;
}

pub struct StaticAuthGate {
    state: AuthState,
}

impl StaticAuthGate {
    pub fn new(state: AuthState) -> Self {
        Self { state }
    }
}

impl AuthGate for StaticAuthGate {
    fn state(&self) -> AuthState {
        self.state.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRouteDecision {
    Loading,
    RedirectToLogin,
    RedirectToHome,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRouteDecision {
    Loading,
    RedirectToAdmin,
    RedirectToHome,
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPolicy {
    admin_email: String,
}

impl AdminPolicy {
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
        }
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn is_admin(&self, state: &AuthState) -> bool {
        !state.loading && state.user_email.as_deref() == Some(self.admin_email.as_str())
    }

    pub fn admin_route(&self, state: &AuthState) -> AdminRouteDecision {
        if state.loading {
            return AdminRouteDecision::Loading;
        }
        match state.user_email {
            None => AdminRouteDecision::RedirectToLogin,
            Some(_) if self.is_admin(state) => AdminRouteDecision::Allow,
            Some(_) => AdminRouteDecision::RedirectToHome,
        }
    }

    /// The login page is only shown to signed-out visitors.
    pub fn login_route(&self, state: &AuthState) -> LoginRouteDecision {
        if state.loading {
            return LoginRouteDecision::Loading;
        }
        match state.user_email {
            None => LoginRouteDecision::Allow,
            Some(_) if self.is_admin(state) => LoginRouteDecision::RedirectToAdmin,
            Some(_) => LoginRouteDecision::RedirectToHome,
        }
    }

    pub fn check(&self, gate: &dyn AuthGate) -> AdminRouteDecision {
        self.admin_route(&gate.state())
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
