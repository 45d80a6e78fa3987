//! Command preconditions
//!
//! A command declares an ordered [`RequirementChain`]. The chain is evaluated
//! before the command does anything and stops at the first failing
//! [`Requirement`], so later checks (including the API version probe) never
//! run once an earlier one has failed.
//!
//! Commands needing org/space context use the canonical order
//! endpoint, logged in, minimum API version, org, space.

use semver::Version;
use tracing::debug;

use crate::app::client::info::parse_lenient;
use crate::app::session::AuthenticatedSession;
use crate::config::SessionState;
use crate::errors::{RequirementError, Result, TargetScope};

/// A single precondition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// An API endpoint is targeted
    ApiEndpoint,
    /// Some token is stored
    LoggedIn,
    /// The target advertises at least this API version
    MinApiVersion(Version),
    /// An organization is targeted
    TargetedOrganization,
    /// A space is targeted
    TargetedSpace,
}

impl Requirement {
    /// Evaluate against the session; only `MinApiVersion` touches the network
    pub async fn evaluate(&self, session: &mut AuthenticatedSession) -> Result<()> {
        match self {
            Requirement::MinApiVersion(required) => {
                let current = session.api_version().await?;
                check_version(required, current)?;
            }
            Requirement::ApiEndpoint
            | Requirement::LoggedIn
            | Requirement::TargetedOrganization
            | Requirement::TargetedSpace => self.check_state(session.state())?,
        }
        Ok(())
    }

    /// Check against persisted state only. `MinApiVersion` compares with the
    /// version recorded at the last probe.
    pub fn check_state(&self, state: &SessionState) -> std::result::Result<(), RequirementError> {
        match self {
            Requirement::ApiEndpoint if !state.has_target() => {
                Err(RequirementError::NoApiEndpoint)
            }
            Requirement::ApiEndpoint => Ok(()),
            Requirement::LoggedIn if !state.is_logged_in() => Err(RequirementError::NotLoggedIn),
            Requirement::LoggedIn => Ok(()),
            Requirement::MinApiVersion(required) => {
                check_version(required, parse_lenient(&state.api_version))
            }
            Requirement::TargetedOrganization if !state.has_organization() => Err(
                RequirementError::TargetNotSet(TargetScope::Organization),
            ),
            Requirement::TargetedOrganization => Ok(()),
            Requirement::TargetedSpace if !state.has_space() => {
                Err(RequirementError::TargetNotSet(TargetScope::Space))
            }
            Requirement::TargetedSpace => Ok(()),
        }
    }
}

/// Compare major.minor.patch only. A missing version never passes.
pub fn check_version(
    required: &Version,
    current: Option<Version>,
) -> std::result::Result<(), RequirementError> {
    match current {
        Some(current)
            if (current.major, current.minor, current.patch)
                >= (required.major, required.minor, required.patch) =>
        {
            Ok(())
        }
        current => Err(RequirementError::MinApiVersionNotMet {
            required: required.clone(),
            current,
        }),
    }
}

/// Ordered requirements for one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementChain {
    requirements: Vec<Requirement>,
}

impl RequirementChain {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    /// Append a requirement, evaluated after those already present
    pub fn with(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Endpoint and login
    pub fn logged_in() -> Self {
        Self::new(vec![Requirement::ApiEndpoint, Requirement::LoggedIn])
    }

    /// Endpoint, login, optional version floor, org
    pub fn targeted_organization(min_version: Option<Version>) -> Self {
        let mut chain = Self::logged_in();
        if let Some(version) = min_version {
            chain = chain.with(Requirement::MinApiVersion(version));
        }
        chain.with(Requirement::TargetedOrganization)
    }

    /// Endpoint, login, optional version floor, org, space
    pub fn targeted_space(min_version: Option<Version>) -> Self {
        Self::targeted_organization(min_version).with(Requirement::TargetedSpace)
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Evaluate in order, returning the first failure unchanged
    pub async fn evaluate(&self, session: &mut AuthenticatedSession) -> Result<()> {
        for requirement in &self.requirements {
            debug!("Checking requirement {:?}", requirement);
            requirement.evaluate(session).await?;
        }
        Ok(())
    }
}

impl FromIterator<Requirement> for RequirementChain {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Organization, Space};

    #[test]
    fn test_version_gate() {
        let required = Version::new(3, 11, 0);

        assert!(check_version(&required, Some(Version::new(3, 0, 0))).is_err());
        assert!(check_version(&required, Some(Version::new(3, 11, 0))).is_ok());
        assert!(check_version(&required, Some(Version::new(3, 20, 0))).is_ok());
        assert!(check_version(&required, Some(Version::new(4, 0, 0))).is_ok());
        assert!(check_version(&required, Some(Version::new(3, 10, 99))).is_err());
    }

    #[test]
    fn test_missing_version_fails() {
        let err = check_version(&Version::new(3, 11, 0), None).unwrap_err();
        assert_eq!(
            err,
            RequirementError::MinApiVersionNotMet {
                required: Version::new(3, 11, 0),
                current: None
            }
        );
    }

    #[test]
    fn test_prerelease_compares_on_numbers_only() {
        let current = Version::parse("3.11.0-rc.1").unwrap();
        assert!(check_version(&Version::new(3, 11, 0), Some(current)).is_ok());
    }

    #[test]
    fn test_state_checks() {
        let mut state = SessionState::default();
        assert_eq!(
            Requirement::ApiEndpoint.check_state(&state),
            Err(RequirementError::NoApiEndpoint)
        );
        assert_eq!(
            Requirement::LoggedIn.check_state(&state),
            Err(RequirementError::NotLoggedIn)
        );

        state.target = "https://api.example.com".to_string();
        state.access_token = "bearer token".to_string();
        assert!(Requirement::ApiEndpoint.check_state(&state).is_ok());
        assert!(Requirement::LoggedIn.check_state(&state).is_ok());
        assert_eq!(
            Requirement::TargetedOrganization.check_state(&state),
            Err(RequirementError::TargetNotSet(TargetScope::Organization))
        );

        state.set_organization(Organization::new("org-guid", "org"));
        assert!(Requirement::TargetedOrganization.check_state(&state).is_ok());
        assert_eq!(
            Requirement::TargetedSpace.check_state(&state),
            Err(RequirementError::TargetNotSet(TargetScope::Space))
        );

        state.set_space(Space::new("space-guid", "dev")).unwrap();
        assert!(Requirement::TargetedSpace.check_state(&state).is_ok());
    }

    #[test]
    fn test_state_version_check_uses_recorded_version() {
        let required = Requirement::MinApiVersion(Version::new(3, 27, 0));
        let mut state = SessionState::default();
        assert!(matches!(
            required.check_state(&state),
            Err(RequirementError::MinApiVersionNotMet { current: None, .. })
        ));

        state.api_version = "3.20.0".to_string();
        assert!(required.check_state(&state).is_err());

        state.api_version = "3.85".to_string();
        assert!(required.check_state(&state).is_ok());
    }

    #[test]
    fn test_canonical_order() {
        let chain = RequirementChain::targeted_space(Some(Version::new(3, 27, 0)));
        assert_eq!(
            chain.requirements(),
            &[
                Requirement::ApiEndpoint,
                Requirement::LoggedIn,
                Requirement::MinApiVersion(Version::new(3, 27, 0)),
                Requirement::TargetedOrganization,
                Requirement::TargetedSpace,
            ]
        );

        let chain: RequirementChain = vec![Requirement::LoggedIn].into_iter().collect();
        assert_eq!(chain.requirements(), &[Requirement::LoggedIn]);
    }
}
