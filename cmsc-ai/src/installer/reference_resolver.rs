//! Reference resolution
//!
//! Records are created before every record they point at necessarily
//! exists, so reference fields go out holding slugs. Once the batch is in,
//! each slug is swapped for the backend id and the record patched.
//!
//! Lookup order per slug: batch map, lookup cache, then one remote query.
//! Values that look like backend ids skip the last two.
//! Both maps are monotonic for the life of the batch.

use crate::models::{FieldKind, FieldValue};
use crate::services::BackendGateway;
use cmsc_common::uuid_utils::looks_like_backend_id;
use serde_json::Value;
use std::collections::HashMap;

/// Record created by this batch, as seen by the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledRecord {
    pub assigned_id: String,
    pub original_slug: String,
    pub assigned_slug: String,
    pub title_slug: String,
    pub field_values: Vec<FieldValue>,
}

/// `slug -> id` for records created in the current batch
///
/// First insert wins; later inserts for the same slug are ignored.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    entries: HashMap<String, String>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the slug was already mapped
    pub fn insert(&mut self, slug: &str, id: &str) -> bool {
        if slug.is_empty() || self.entries.contains_key(slug) {
            return false;
        }
        self.entries.insert(slug.to_string(), id.to_string());
        true
    }

    /// Map every slug alias of an installed record
    pub fn insert_record(&mut self, record: &InstalledRecord) {
        for slug in [
            &record.original_slug,
            &record.assigned_slug,
            &record.title_slug,
        ] {
            self.insert(slug, &record.assigned_id);
        }
    }

    pub fn get(&self, slug: &str) -> Option<&str> {
        self.entries.get(slug).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Swaps slug references for backend ids
pub struct ReferenceResolver<'a> {
    gateway: &'a dyn BackendGateway,
    map: ReferenceMap,
    /// Remote lookups; `None` is a confirmed miss
    cache: HashMap<String, Option<String>>,
    remote_lookups: usize,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(gateway: &'a dyn BackendGateway, map: ReferenceMap) -> Self {
        Self {
            gateway,
            map,
            cache: HashMap::new(),
            remote_lookups: 0,
        }
    }

    /// Number of remote slug queries issued so far
    pub fn remote_lookups(&self) -> usize {
        self.remote_lookups
    }

    /// Resolve and patch every record whose references changed
    ///
    /// Best effort: unresolved slugs stay as they are and patch failures are
    /// only logged. Records are updated in place to reflect what was sent.
    pub async fn resolve(&mut self, records: &mut [InstalledRecord]) {
        let mut patched = 0usize;

        for record in records.iter_mut() {
            let mut changed = false;
            for field in record.field_values.iter_mut() {
                changed |= self.resolve_field(field).await;
            }

            if !changed {
                continue;
            }

            match self
                .gateway
                .patch_record(&record.assigned_id, &record.field_values)
                .await
            {
                Ok(()) => {
                    patched += 1;
                    tracing::debug!(id = %record.assigned_id, slug = %record.assigned_slug, "Patched references");
                }
                Err(e) => {
                    tracing::debug!(
                        id = %record.assigned_id,
                        slug = %record.assigned_slug,
                        error = %e,
                        "Reference patch failed"
                    );
                }
            }
        }

        tracing::info!(
            records = records.len(),
            patched,
            remote_lookups = self.remote_lookups,
            "Reference resolution complete"
        );
    }

    async fn resolve_field(&mut self, field: &mut FieldValue) -> bool {
        match field.kind {
            FieldKind::SingleReference => {
                let Some(slug) = field.value.as_str().map(str::to_string) else {
                    return false;
                };
                match self.resolve_slug(&slug).await {
                    Some(id) => {
                        field.value = Value::String(id);
                        true
                    }
                    None => false,
                }
            }
            FieldKind::MultiReference => {
                let Value::Array(items) = &mut field.value else {
                    return false;
                };
                let mut changed = false;
                for item in items.iter_mut() {
                    let Some(slug) = item.as_str().map(str::to_string) else {
                        continue;
                    };
                    if let Some(id) = self.resolve_slug(&slug).await {
                        *item = Value::String(id);
                        changed = true;
                    }
                }
                changed
            }
            _ => false,
        }
    }

    /// New id for `slug`, or `None` when it should stay untouched
    ///
    /// A value shaped like a backend id (24 hex characters) that no record
    /// in this batch uses as its slug is taken as already resolved and never
    /// queried remotely. An existing record whose real slug has that shape
    /// therefore cannot be found by slug from another batch.
    async fn resolve_slug(&mut self, slug: &str) -> Option<String> {
        let slug = slug.trim();
        if slug.is_empty() {
            return None;
        }

        let id = match self.map.get(slug) {
            Some(id) => id.to_string(),
            None if looks_like_backend_id(slug) => return None,
            None => self.lookup(slug).await?,
        };
        (id != slug).then_some(id)
    }

    async fn lookup(&mut self, slug: &str) -> Option<String> {
        if let Some(id) = self.map.get(slug) {
            return Some(id.to_string());
        }
        if let Some(cached) = self.cache.get(slug) {
            return cached.clone();
        }

        self.remote_lookups += 1;
        let found = match self.gateway.find_records_by_slug(slug, 1).await {
            Ok(records) => records.into_iter().next().map(|record| record.id),
            Err(e) => {
                tracing::debug!(slug = %slug, error = %e, "Reference lookup failed");
                None
            }
        };

        if found.is_none() {
            tracing::debug!(slug = %slug, "Reference not found, leaving slug in place");
        }
        self.cache.insert(slug.to_string(), found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(id: &str, slug: &str, title_slug: &str) -> InstalledRecord {
        InstalledRecord {
            assigned_id: id.to_string(),
            original_slug: slug.to_string(),
            assigned_slug: slug.to_string(),
            title_slug: title_slug.to_string(),
            field_values: Vec::new(),
        }
    }

    #[test]
    fn test_reference_map_first_insert_wins() {
        let mut map = ReferenceMap::new();
        assert!(map.insert("a", "1"));
        assert!(!map.insert("a", "2"));
        assert!(!map.insert("", "3"));
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_record_maps_aliases() {
        let mut map = ReferenceMap::new();
        map.insert_record(&installed("id-1", "post-a", "post-a-title"));
        assert_eq!(map.get("post-a"), Some("id-1"));
        assert_eq!(map.get("post-a-title"), Some("id-1"));
    }
}
