//! Organization, space and app lookups
//!
//! Thin paginated readers over the v3 list endpoints. Every request goes
//! through the session, so each one gets the token renewal behaviour.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::session::AuthenticatedSession;
use crate::config::{Organization, Space};
use crate::errors::{ApiError, Result};

/// The fields the CLI needs from any named resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Resource {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    resources: Vec<T>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

/// Lookups against the targeted backend
pub struct CloudController<'a> {
    session: &'a mut AuthenticatedSession,
}

impl<'a> CloudController<'a> {
    pub fn new(session: &'a mut AuthenticatedSession) -> Self {
        Self { session }
    }

    /// All organizations visible to the user, by name
    pub async fn organizations(&mut self) -> Result<Vec<Resource>> {
        let url = self.endpoint("/v3/organizations", &[("order_by", "name")])?;
        self.list(url).await
    }

    /// The organization called `name`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no visible organization has that name
    pub async fn find_organization(&mut self, name: &str) -> Result<Organization> {
        let url = self.endpoint("/v3/organizations", &[("names", name)])?;
        let found: Vec<Resource> = self.list(url).await?;
        found
            .into_iter()
            .next()
            .map(|org| Organization::new(org.guid, org.name))
            .ok_or_else(|| {
                ApiError::NotFound {
                    resource: "Organization",
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Spaces of an organization, by name
    pub async fn spaces(&mut self, organization_guid: &str) -> Result<Vec<Resource>> {
        let url = self.endpoint(
            "/v3/spaces",
            &[("organization_guids", organization_guid), ("order_by", "name")],
        )?;
        self.list(url).await
    }

    /// The space called `name` within an organization
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the organization has no such space
    pub async fn find_space(&mut self, organization_guid: &str, name: &str) -> Result<Space> {
        let url = self.endpoint(
            "/v3/spaces",
            &[("names", name), ("organization_guids", organization_guid)],
        )?;
        let found: Vec<Resource> = self.list(url).await?;
        found
            .into_iter()
            .next()
            .map(|space| Space::new(space.guid, space.name))
            .ok_or_else(|| {
                ApiError::NotFound {
                    resource: "Space",
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Apps of a space with their state, by name
    pub async fn apps(&mut self, space_guid: &str) -> Result<Vec<Resource>> {
        let url = self.endpoint(
            "/v3/apps",
            &[("space_guids", space_guid), ("order_by", "name")],
        )?;
        self.list(url).await
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.session.url_for(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn list<T: DeserializeOwned>(&mut self, first: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            debug!("Listing {}", url);
            let page: Page<T> = self.session.get_json(url).await?;
            items.extend(page.resources);
            if let Some(link) = page.pagination.next {
                next = Some(self.session.url_for(&link.href)?);
            }
        }
        Ok(items)
    }
}
