//! Record installation

use super::field_inference::{ensure_field_ids, normalize_record_fields};
use super::media::{resolve_file_value, resolve_image};
use super::phase_index::MetafieldIndex;
use super::reference_resolver::{InstalledRecord, ReferenceMap};
use super::InstallSettings;
use crate::models::{
    FieldValue, InstallOutcome, InstallSummary, NewRecord, RecordDefinition,
};
use crate::services::{BackendGateway, MediaUploader};
use cmsc_common::slugify;
use serde_json::Value;

/// Order records so those whose type declares fewer references go first
///
/// Stable, and only a heuristic: a record can still precede a record it
/// points at. The resolver patches whatever this misses.
pub fn order_records<'r>(
    records: &'r [RecordDefinition],
    index: &MetafieldIndex,
) -> Vec<&'r RecordDefinition> {
    let mut ordered: Vec<&RecordDefinition> = records.iter().collect();
    ordered.sort_by_key(|record| index.reference_count(record.type_slug.trim()));
    ordered
}

pub(super) struct RecordInstaller<'a> {
    pub gateway: &'a dyn BackendGateway,
    pub uploader: &'a dyn MediaUploader,
    pub settings: &'a InstallSettings,
    pub index: &'a MetafieldIndex,
}

impl RecordInstaller<'_> {
    /// Create each record in order, mapping created slugs into `refs`
    pub async fn install(
        &self,
        records: &[RecordDefinition],
        summary: &mut InstallSummary,
        refs: &mut ReferenceMap,
    ) -> Vec<InstalledRecord> {
        let mut installed = Vec::new();

        for record in order_records(records, self.index) {
            let outcome = match self.install_one(record, refs).await {
                Ok(done) => {
                    refs.insert_record(&done);
                    installed.push(done);
                    InstallOutcome::Created
                }
                Err(outcome) => outcome,
            };
            summary.add_record_outcome(&record.title, outcome);
        }

        installed
    }

    async fn install_one(
        &self,
        record: &RecordDefinition,
        refs: &ReferenceMap,
    ) -> Result<InstalledRecord, InstallOutcome> {
        let type_slug = record.type_slug.trim();
        let requested_slug = record.effective_slug();

        if type_slug.is_empty() {
            return Err(InstallOutcome::Failed("Record has no type".to_string()));
        }
        if self.index.creation_failed(type_slug) {
            tracing::warn!(slug = %requested_slug, type_slug = %type_slug, "Record type failed to install");
            return Err(InstallOutcome::Failed(format!(
                "Type '{}' failed to install",
                type_slug
            )));
        }
        if self.index.is_authoritative() && !self.index.contains_type(type_slug) {
            tracing::warn!(slug = %requested_slug, type_slug = %type_slug, "Record type does not exist");
            return Err(InstallOutcome::Failed(format!(
                "Unknown type '{}'",
                type_slug
            )));
        }

        let default_asset = self.settings.default_asset.as_deref();
        let thumbnail = match record.thumbnail.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(
                resolve_image(url, &self.settings.image_hosts, self.uploader, default_asset).await,
            ),
            _ => None,
        };

        let mut values = normalize_record_fields(&record.fields, self.index.fields_for(type_slug));
        ensure_field_ids(&mut values);
        for field in &mut values {
            if field.kind.is_file() {
                field.value = resolve_file_value(
                    &field.value,
                    &self.settings.image_hosts,
                    self.uploader,
                    default_asset,
                )
                .await;
            } else if field.kind.is_reference() {
                substitute_known_references(field, refs);
            }
        }

        let new_record = NewRecord {
            title: record.title.clone(),
            slug: requested_slug.clone(),
            type_slug: type_slug.to_string(),
            status: record.status,
            thumbnail,
            metafields: values,
        };

        match self.gateway.create_record(&new_record).await {
            Ok(remote) => {
                let assigned_slug = if remote.slug.is_empty() {
                    requested_slug.clone()
                } else {
                    remote.slug.clone()
                };
                tracing::info!(
                    id = %remote.id,
                    slug = %assigned_slug,
                    type_slug = %type_slug,
                    "Created record"
                );
                Ok(InstalledRecord {
                    assigned_id: remote.id,
                    original_slug: requested_slug,
                    assigned_slug,
                    title_slug: slugify(&record.title),
                    field_values: new_record.metafields,
                })
            }
            Err(e) if e.is_duplicate() => {
                tracing::info!(slug = %requested_slug, "Record already exists, skipping");
                Err(InstallOutcome::SkippedDuplicate)
            }
            Err(e) => {
                tracing::warn!(slug = %requested_slug, error = %e, "Failed to create record");
                Err(InstallOutcome::Failed(e.to_string()))
            }
        }
    }
}

/// Replace slugs of records already created this batch with their ids
fn substitute_known_references(field: &mut FieldValue, refs: &ReferenceMap) {
    let lookup = |slug: &str| refs.get(slug.trim()).map(str::to_string);

    match &mut field.value {
        Value::String(slug) => {
            if let Some(id) = lookup(slug.as_str()) {
                *slug = id;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Some(id) = item.as_str().and_then(lookup) {
                    *item = Value::String(id);
                }
            }
        }
        _ => {}
    }
}
