//! Types flowing through the fetch half of the pipeline.

use serde::{Deserialize, Serialize};

/// What to search for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text search query.
    pub text: String,
    /// Number of results to request.
    pub quantity: u32,
}

/// One candidate photo from a search response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: String,
    pub is_public: bool,
}

/// One rendition of a photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variant {
    /// Service label such as "Small" or "Original", if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Where the bytes can be fetched from.
    pub location: String,
}

/// All renditions of one photo. Never empty.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VariantSet {
    id: String,
    variants: Vec<Variant>,
}

impl VariantSet {
    /// Returns `None` when `variants` is empty.
    pub fn new(id: impl Into<String>, variants: Vec<Variant>) -> Option<Self> {
        if variants.is_empty() {
            return None;
        }
        Some(Self {
            id: id.into(),
            variants,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// The rendition to download: the last one listed by the service.
    ///
    /// The service lists renditions smallest first, so this is taken to be
    /// the largest. Sizes are not compared.
    pub fn selected(&self) -> &Variant {
        &self.variants[self.variants.len() - 1]
    }
}

/// Downloaded bytes for one photo.
#[derive(Clone, PartialEq, Eq)]
pub struct RawPayload {
    /// Photo the bytes belong to, when known.
    pub id: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawPayload {
    pub fn new(id: Option<String>, bytes: Vec<u8>) -> Self {
        Self { id, bytes }
    }
}

impl std::fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPayload")
            .field("id", &self.id)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(label: &str, width: u32, height: u32) -> Variant {
        Variant {
            label: Some(label.to_string()),
            width,
            height,
            location: format!("https://live.example/{}.jpg", label.to_lowercase()),
        }
    }

    #[test]
    fn test_variant_set_rejects_empty() {
        assert!(VariantSet::new("1", vec![]).is_none());
    }

    #[test]
    fn test_selected_is_last_listed() {
        let set = VariantSet::new(
            "42",
            vec![
                variant("Square", 75, 75),
                variant("Medium", 500, 375),
                variant("Large", 1024, 768),
            ],
        )
        .unwrap();

        assert_eq!(set.id(), "42");
        assert_eq!(set.variants().len(), 3);
        assert_eq!(set.selected().label.as_deref(), Some("Large"));
    }

    #[test]
    fn test_selected_ignores_dimensions() {
        // A service that lists a smaller rendition last still wins the tie-break.
        let set = VariantSet::new("7", vec![variant("Large", 1024, 768), variant("Thumb", 100, 75)])
            .unwrap();
        assert_eq!(set.selected().label.as_deref(), Some("Thumb"));
    }

    #[test]
    fn test_raw_payload_debug_hides_bytes() {
        let payload = RawPayload::new(Some("9".to_string()), vec![0u8; 2048]);
        let debug = format!("{:?}", payload);
        assert!(debug.contains("2048"));
        assert!(!debug.contains("0, 0, 0"));
    }

    #[test]
    fn test_search_query_serialization() {
        let query = SearchQuery {
            text: "northern lights".to_string(),
            quantity: 25,
        };
        let json = serde_json::to_string(&query).unwrap();
        let parsed: SearchQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, query);
    }
}
