use profilehub_core::ProfileId;

/// The identity a request acts as, as resolved by token authentication.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    /// No credentials were presented.
    #[default]
    Anonymous,
    /// A valid token resolved to this (active) profile.
    Profile(ProfileId),
}

impl Principal {
    pub fn profile_id(&self) -> Option<ProfileId> {
        match self {
            Principal::Anonymous => None,
            Principal::Profile(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::Profile(_))
    }

    /// Whether this principal is the given profile.
    pub fn is(&self, profile_id: ProfileId) -> bool {
        self.profile_id() == Some(profile_id)
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Principal::Anonymous => f.write_str("anonymous"),
            Principal::Profile(id) => write!(f, "profile:{id}"),
        }
    }
}
