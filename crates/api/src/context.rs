use profilehub_auth::Principal;

/// Principal context for a request, inserted by the auth middleware.
///
/// Always present: requests without credentials carry `Principal::Anonymous`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }
}
