//! # Taxonomy - Ordinal and Name Mapping
//!
//! ## Purpose
//!
//! A taxonomy maps small integer ordinals to field names and back. When an
//! envelope declares a taxonomy id, the writer may send the ordinal in place
//! of a name it can map, and the reader fills the name back in. Only the id
//! travels on the wire; callers supply the definitions through a
//! [`TaxonomyResolver`].
//!
//! Misses are never errors: an unknown taxonomy id, ordinal or name leaves the
//! field exactly as the wire or the caller gave it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Bidirectional ordinal and name lookup
pub trait Taxonomy: Send + Sync {
    fn field_name(&self, ordinal: i16) -> Option<&str>;

    fn field_ordinal(&self, name: &str) -> Option<i16>;
}

/// Finds the taxonomy for an envelope's taxonomy id
pub trait TaxonomyResolver: Send + Sync {
    fn resolve(&self, taxonomy_id: i16) -> Option<Arc<dyn Taxonomy>>;
}

/// Taxonomy backed by in-memory maps
///
/// Serializes as an ordinal to name map:
///
/// ```
/// use codec::{MapTaxonomy, Taxonomy};
///
/// let taxonomy: MapTaxonomy = serde_json::from_str(r#"{"1": "bid", "2": "volume"}"#)?;
/// assert_eq!(taxonomy.field_ordinal("volume"), Some(2));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<i16, String>", into = "BTreeMap<i16, String>")]
pub struct MapTaxonomy {
    names: HashMap<i16, String>,
    ordinals: HashMap<String, i16>,
}

impl MapTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping, replacing any earlier mapping of the ordinal or the name
    pub fn insert(&mut self, ordinal: i16, name: impl Into<String>) {
        let name = name.into();
        if let Some(old_name) = self.names.insert(ordinal, name.clone()) {
            self.ordinals.remove(&old_name);
        }
        if let Some(old_ordinal) = self.ordinals.insert(name, ordinal) {
            if old_ordinal != ordinal {
                self.names.remove(&old_ordinal);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Taxonomy for MapTaxonomy {
    fn field_name(&self, ordinal: i16) -> Option<&str> {
        self.names.get(&ordinal).map(String::as_str)
    }

    fn field_ordinal(&self, name: &str) -> Option<i16> {
        self.ordinals.get(name).copied()
    }
}

impl<S: Into<String>> FromIterator<(i16, S)> for MapTaxonomy {
    fn from_iter<I: IntoIterator<Item = (i16, S)>>(iter: I) -> Self {
        let mut taxonomy = Self::new();
        for (ordinal, name) in iter {
            taxonomy.insert(ordinal, name);
        }
        taxonomy
    }
}

impl From<BTreeMap<i16, String>> for MapTaxonomy {
    fn from(map: BTreeMap<i16, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<MapTaxonomy> for BTreeMap<i16, String> {
    fn from(taxonomy: MapTaxonomy) -> Self {
        taxonomy.names.into_iter().collect()
    }
}

/// Resolver keyed by taxonomy id
#[derive(Default, Clone)]
pub struct MapTaxonomyResolver {
    taxonomies: HashMap<i16, Arc<dyn Taxonomy>>,
}

impl MapTaxonomyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxonomy(mut self, taxonomy_id: i16, taxonomy: impl Taxonomy + 'static) -> Self {
        self.insert(taxonomy_id, Arc::new(taxonomy));
        self
    }

    pub fn insert(&mut self, taxonomy_id: i16, taxonomy: Arc<dyn Taxonomy>) {
        self.taxonomies.insert(taxonomy_id, taxonomy);
    }

    pub fn len(&self) -> usize {
        self.taxonomies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxonomies.is_empty()
    }
}

impl std::fmt::Debug for MapTaxonomyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.taxonomies.keys().collect();
        ids.sort();
        f.debug_struct("MapTaxonomyResolver")
            .field("taxonomy_ids", &ids)
            .finish()
    }
}

impl TaxonomyResolver for MapTaxonomyResolver {
    fn resolve(&self, taxonomy_id: i16) -> Option<Arc<dyn Taxonomy>> {
        self.taxonomies.get(&taxonomy_id).cloned()
    }
}
