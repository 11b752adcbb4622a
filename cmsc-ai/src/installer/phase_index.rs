//! Metafield index: field declarations by type slug

use crate::models::{FieldSpec, TypeDefinition};
use std::collections::{HashMap, HashSet};

/// `type slug -> (field key -> FieldSpec)`
#[derive(Debug, Default)]
pub struct MetafieldIndex {
    types: HashMap<String, HashMap<String, FieldSpec>>,
    /// Slugs whose creation failed this batch
    failed: HashSet<String>,
    /// Built from a successful listing of the backend's types
    authoritative: bool,
}

impl MetafieldIndex {
    /// Build from listed types, overlaid with types created this batch
    ///
    /// Without a listing, `requested` fills in types missing from `created`
    /// so the batch's own declarations stay usable. Types in `failed` are
    /// never indexed.
    pub fn build(
        listed: Option<Vec<TypeDefinition>>,
        created: &[TypeDefinition],
        requested: &[TypeDefinition],
        failed: HashSet<String>,
    ) -> Self {
        let authoritative = listed.is_some();
        let mut index = Self {
            types: HashMap::new(),
            failed,
            authoritative,
        };

        for def in listed.iter().flatten() {
            index.insert(def);
        }
        for def in created {
            index.insert(def);
        }
        if !authoritative {
            for def in requested {
                let slug = def.effective_slug();
                if !index.types.contains_key(&slug) && !index.failed.contains(&slug) {
                    index.insert(def);
                }
            }
        }

        tracing::debug!(types = index.types.len(), authoritative, "Built metafield index");
        index
    }

    fn insert(&mut self, def: &TypeDefinition) {
        let fields = def
            .fields
            .iter()
            .map(|field| (field.key.clone(), field.clone()))
            .collect();
        self.types.insert(def.effective_slug(), fields);
    }

    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    /// Creation of this type failed earlier in the batch
    pub fn creation_failed(&self, type_slug: &str) -> bool {
        self.failed.contains(type_slug) && !self.types.contains_key(type_slug)
    }

    pub fn contains_type(&self, type_slug: &str) -> bool {
        self.types.contains_key(type_slug)
    }

    pub fn fields_for(&self, type_slug: &str) -> Option<&HashMap<String, FieldSpec>> {
        self.types.get(type_slug)
    }

    /// Number of reference fields the type declares (0 when unknown)
    pub fn reference_count(&self, type_slug: &str) -> usize {
        self.types
            .get(type_slug)
            .map(|fields| fields.values().filter(|f| f.kind.is_reference()).count())
            .unwrap_or(0)
    }
}
