//! Mock photo service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::photo::{ContentFetcher, ItemRecord, PhotoCatalog, SearchQuery, ServiceError, Variant};

#[derive(Debug, Clone)]
struct MockPhoto {
    id: String,
    is_public: bool,
}

/// Mock implementation of both [`PhotoCatalog`] and [`ContentFetcher`].
///
/// Provides controllable behavior for testing:
/// - Photos with configurable visibility and content
/// - Per-photo variant lists, resolution failures and delays
/// - Per-location fetch failures and a global fetch delay
/// - Recording of every call, plus peak fetch concurrency
///
/// Every photo added with [`add_photo`](Self::add_photo) gets two variants:
/// a "Small" one whose location has no content, and an "Original" one at
/// [`location_for`](Self::location_for) serving the photo's bytes. Only the
/// last-listed variant can be downloaded.
///
/// # Example
///
/// ```rust,ignore
/// use collage_core::testing::{MockPhotoService, fixtures};
///
/// let service = MockPhotoService::new();
/// service.add_photo("1", true, fixtures::png_bytes(64, 48, 3)).await;
/// service.add_photo("2", false, fixtures::png_bytes(64, 48, 3)).await;
///
/// let catalog: Arc<dyn PhotoCatalog> = Arc::new(service.clone());
/// let fetcher: Arc<dyn ContentFetcher> = Arc::new(service.clone());
///
/// // ... run the pipeline ...
///
/// assert_eq!(service.search_count().await, 1);
/// ```
#[derive(Clone)]
pub struct MockPhotoService {
    /// Photos returned by search, in order.
    photos: Arc<RwLock<Vec<MockPhoto>>>,
    /// Variant lists by photo id.
    variants: Arc<RwLock<HashMap<String, Vec<Variant>>>>,
    /// Bytes by location.
    content: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Photo ids whose variant lookup fails.
    failing_variants: Arc<RwLock<HashSet<String>>>,
    /// Locations whose fetch fails.
    failing_locations: Arc<RwLock<HashSet<String>>>,
    /// Per-photo delay before variants are returned.
    resolve_delays: Arc<RwLock<HashMap<String, Duration>>>,
    /// Delay applied to every fetch.
    fetch_delay: Arc<RwLock<Option<Duration>>>,
    /// If set, the next search will fail with this error.
    next_search_error: Arc<RwLock<Option<ServiceError>>>,
    /// Recorded calls.
    searches: Arc<RwLock<Vec<SearchQuery>>>,
    variant_requests: Arc<RwLock<Vec<String>>>,
    fetches: Arc<RwLock<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockPhotoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPhotoService")
            .field("photos", &"<photos>")
            .field("variants", &"<variants>")
            .field("content", &"<content>")
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MockPhotoService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPhotoService {
    /// Create an empty mock service.
    pub fn new() -> Self {
        Self {
            photos: Arc::new(RwLock::new(Vec::new())),
            variants: Arc::new(RwLock::new(HashMap::new())),
            content: Arc::new(RwLock::new(HashMap::new())),
            failing_variants: Arc::new(RwLock::new(HashSet::new())),
            failing_locations: Arc::new(RwLock::new(HashSet::new())),
            resolve_delays: Arc::new(RwLock::new(HashMap::new())),
            fetch_delay: Arc::new(RwLock::new(None)),
            next_search_error: Arc::new(RwLock::new(None)),
            searches: Arc::new(RwLock::new(Vec::new())),
            variant_requests: Arc::new(RwLock::new(Vec::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Location of the downloadable ("Original") variant of a photo.
    pub fn location_for(id: &str) -> String {
        format!("mock://{}/original", id)
    }

    /// Add a photo to the search results, serving `content` at its original location.
    pub async fn add_photo(&self, id: &str, is_public: bool, content: Vec<u8>) {
        self.photos.write().await.push(MockPhoto {
            id: id.to_string(),
            is_public,
        });
        self.variants.write().await.insert(
            id.to_string(),
            vec![
                Variant {
                    label: Some("Small".to_string()),
                    width: 240,
                    height: 180,
                    location: format!("mock://{}/small", id),
                },
                Variant {
                    label: Some("Original".to_string()),
                    width: 1024,
                    height: 768,
                    location: Self::location_for(id),
                },
            ],
        );
        self.content
            .write()
            .await
            .insert(Self::location_for(id), content);
    }

    /// Replace the variant list of a photo.
    pub async fn set_variants(&self, id: &str, variants: Vec<Variant>) {
        self.variants.write().await.insert(id.to_string(), variants);
    }

    /// Make the variant lookup for `id` fail.
    pub async fn fail_variants(&self, id: &str) {
        self.failing_variants.write().await.insert(id.to_string());
    }

    /// Make the download of `id`'s original variant fail.
    pub async fn fail_fetch(&self, id: &str) {
        self.failing_locations
            .write()
            .await
            .insert(Self::location_for(id));
    }

    /// Delay the variant lookup for `id`.
    pub async fn set_resolve_delay(&self, id: &str, delay: Duration) {
        self.resolve_delays
            .write()
            .await
            .insert(id.to_string(), delay);
    }

    /// Delay every fetch.
    pub async fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.write().await = Some(delay);
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_search_error(&self, error: ServiceError) {
        *self.next_search_error.write().await = Some(error);
    }

    /// Get recorded search queries.
    pub async fn recorded_searches(&self) -> Vec<SearchQuery> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Photo ids whose variants were requested, in call order.
    pub async fn variant_requests(&self) -> Vec<String> {
        self.variant_requests.read().await.clone()
    }

    /// Locations fetched, in call order.
    pub async fn fetched_locations(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }

    /// Highest number of fetches observed in flight at once.
    pub async fn max_concurrent_fetches(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn not_found(what: &str) -> ServiceError {
        ServiceError::Api {
            code: 1,
            message: format!("{} not found", what),
        }
    }
}

#[async_trait]
impl PhotoCatalog for MockPhotoService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ItemRecord>, ServiceError> {
        self.searches.write().await.push(query.clone());

        if let Some(error) = self.next_search_error.write().await.take() {
            return Err(error);
        }

        Ok(self
            .photos
            .read()
            .await
            .iter()
            .take(query.quantity as usize)
            .map(|p| ItemRecord {
                id: p.id.clone(),
                is_public: p.is_public,
            })
            .collect())
    }

    async fn variants(&self, id: &str) -> Result<Vec<Variant>, ServiceError> {
        self.variant_requests.write().await.push(id.to_string());

        let delay = self.resolve_delays.read().await.get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_variants.read().await.contains(id) {
            return Err(Self::not_found(&format!("Photo {}", id)));
        }

        self.variants
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found(&format!("Photo {}", id)))
    }
}

#[async_trait]
impl ContentFetcher for MockPhotoService {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, ServiceError> {
        self.fetches.write().await.push(location.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.fetch_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing_locations.read().await.contains(location) {
            Err(ServiceError::Http {
                status: 500,
                message: format!("GET {}", location),
            })
        } else {
            self.content
                .read()
                .await
                .get(location)
                .cloned()
                .ok_or_else(|| ServiceError::Http {
                    status: 404,
                    message: format!("GET {}", location),
                })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
