//! Per-photo metadata resolution.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::photo::{PhotoCatalog, ServiceError, VariantSet};

/// Errors that can occur while resolving one photo.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// The catalog call failed or returned an unexpected shape.
    #[error("Failed to resolve photo {id}: {source}")]
    Service {
        id: String,
        #[source]
        source: ServiceError,
    },

    /// The catalog listed no renditions at all.
    #[error("Photo {id} has no downloadable renditions")]
    NoVariants { id: String },
}

impl ResolutionError {
    /// Identifier of the photo that failed.
    pub fn id(&self) -> &str {
        match self {
            Self::Service { id, .. } | Self::NoVariants { id } => id,
        }
    }
}

/// Resolves a photo identifier into its renditions.
///
/// Stateless; cheap to clone and share across concurrent resolutions.
#[derive(Clone)]
pub struct MetadataResolver {
    catalog: Arc<dyn PhotoCatalog>,
}

impl MetadataResolver {
    pub fn new(catalog: Arc<dyn PhotoCatalog>) -> Self {
        Self { catalog }
    }

    /// One catalog call; the returned set selects the last listed rendition.
    pub async fn resolve(&self, id: &str) -> Result<VariantSet, ResolutionError> {
        let variants = self
            .catalog
            .variants(id)
            .await
            .map_err(|source| ResolutionError::Service {
                id: id.to_string(),
                source,
            })?;

        let set = VariantSet::new(id, variants).ok_or_else(|| ResolutionError::NoVariants {
            id: id.to_string(),
        })?;

        debug!(
            id = id,
            variants = set.variants().len(),
            location = %set.selected().location,
            "Resolved photo"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::Variant;
    use crate::testing::MockPhotoService;

    #[tokio::test]
    async fn test_resolve_selects_last_variant() {
        let service = MockPhotoService::new();
        service
            .set_variants(
                "p1",
                vec![
                    Variant {
                        label: Some("Small".to_string()),
                        width: 240,
                        height: 180,
                        location: "mock://p1/small".to_string(),
                    },
                    Variant {
                        label: Some("Original".to_string()),
                        width: 2400,
                        height: 1800,
                        location: "mock://p1/original".to_string(),
                    },
                ],
            )
            .await;

        let resolver = MetadataResolver::new(Arc::new(service.clone()));
        let set = resolver.resolve("p1").await.unwrap();

        assert_eq!(set.id(), "p1");
        assert_eq!(set.selected().location, "mock://p1/original");
        assert_eq!(service.variant_requests().await, vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_empty_variants_fails() {
        let service = MockPhotoService::new();
        service.set_variants("p2", vec![]).await;

        let resolver = MetadataResolver::new(Arc::new(service));
        let err = resolver.resolve("p2").await.unwrap_err();

        assert!(matches!(err, ResolutionError::NoVariants { .. }));
        assert_eq!(err.id(), "p2");
    }

    #[tokio::test]
    async fn test_resolve_service_error() {
        let service = MockPhotoService::new();
        service.fail_variants("p3").await;

        let resolver = MetadataResolver::new(Arc::new(service));
        let err = resolver.resolve("p3").await.unwrap_err();

        assert!(matches!(err, ResolutionError::Service { .. }));
        assert_eq!(err.id(), "p3");
    }
}
