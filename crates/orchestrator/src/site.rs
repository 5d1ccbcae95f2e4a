//! Site resolution

use site_power::ports::{Geocoder, SiteDirectory};
use site_power::{CollaboratorError, GeocodeError, Site};
use thiserror::Error;
use tracing::info;

/// Failure to produce a located site
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Could not find site {0}")]
    NotFound(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("Site directory failed: {0}")]
    Directory(CollaboratorError),
}

impl SiteError {
    /// Whether the site genuinely cannot be located, as opposed to a
    /// collaborator being unreachable
    pub fn is_structural(&self) -> bool {
        match self {
            SiteError::NotFound(_) => true,
            SiteError::Geocode(GeocodeError::Collaborator(_)) => false,
            SiteError::Geocode(_) => true,
            SiteError::Directory(_) => false,
        }
    }
}

/// Look a site up by name, geocoding and saving its address when the
/// directory has no coordinates for it
pub async fn resolve_site(
    directory: &dyn SiteDirectory,
    geocoder: &dyn Geocoder,
    name: &str,
) -> Result<Site, SiteError> {
    info!("Gathering site details for {}", name);
    let site = directory.site_by_name(name).await.map_err(|e| {
        if e.is_not_found() {
            SiteError::NotFound(name.to_string())
        } else {
            SiteError::Directory(e)
        }
    })?;

    if site.coordinates.is_some() {
        return Ok(site);
    }

    let address = site.address();
    info!("Location is missing coordinates. Geocoding address: {}", address);
    let coordinates = geocoder.resolve(&address).await?;

    info!("Updating site record with resolved coordinates");
    directory
        .set_coordinates(&site.id, coordinates)
        .await
        .map_err(SiteError::Directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{site, World};
    use site_power::Coordinates;

    #[tokio::test]
    async fn test_located_site_skips_geocoding() {
        let world = World::healthy();
        let resolved = resolve_site(&world, &world, "Fresno 12").await.unwrap();
        assert_eq!(resolved, site());
        assert!(!world.called("resolve"));
    }

    #[tokio::test]
    async fn test_missing_coordinates_are_geocoded_and_saved() {
        let mut world = World::healthy();
        world.site.as_mut().unwrap().coordinates = None;

        let resolved = resolve_site(&world, &world, "Fresno 12").await.unwrap();
        assert_eq!(
            resolved.coordinates,
            Some(Coordinates {
                longitude: -119.78,
                latitude: 36.74
            })
        );
        assert!(world.called("resolve"));
        assert!(world.called("set_coordinates"));
    }

    #[tokio::test]
    async fn test_structural_failures() {
        let mut world = World::healthy();
        world.site = None;
        let err = resolve_site(&world, &world, "Atlantis").await.unwrap_err();
        assert!(matches!(err, SiteError::NotFound(ref n) if n == "Atlantis"));
        assert!(err.is_structural());

        let mut world = World::healthy();
        world.site.as_mut().unwrap().coordinates = None;
        world.geocode = Err(GeocodeError::NoCandidate("nowhere".to_string()));
        let err = resolve_site(&world, &world, "Fresno 12").await.unwrap_err();
        assert!(err.is_structural());
        assert!(!world.called("set_coordinates"));
    }

    #[tokio::test]
    async fn test_directory_outage_is_not_structural() {
        let mut world = World::healthy();
        world.directory_error = Some(CollaboratorError::Transport("connection reset".to_string()));
        let err = resolve_site(&world, &world, "Fresno 12").await.unwrap_err();
        assert!(matches!(err, SiteError::Directory(_)));
        assert!(!err.is_structural());
    }
}
