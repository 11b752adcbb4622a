//! Field kind inference and metafield normalization
//!
//! Records arriving as flat key/value maps carry no field metadata. Kinds are
//! recovered from the type's declared fields when known, otherwise guessed
//! from the key name and the value's shape.

use crate::models::{FieldKind, FieldOption, FieldSpec, FieldValue, RecordFields, TypeDefinition};
use cmsc_common::uuid_utils;
use serde_json::{Map, Value};
use std::collections::HashMap;

const GALLERY_HINTS: &[&str] = &["image", "photo", "gallery", "picture"];
const IMAGE_HINTS: &[&str] = &["image", "photo", "picture", "thumbnail", "avatar", "logo", "cover"];
const LONG_TEXT_KEYS: &[&str] = &["content", "body"];

/// Guess a field kind from its key and value
pub fn infer_kind(key: &str, value: &Value) -> FieldKind {
    let key = key.to_ascii_lowercase();

    if value.is_boolean() {
        return FieldKind::Boolean;
    }

    if value.is_array() && GALLERY_HINTS.iter().any(|hint| key.contains(hint)) {
        return FieldKind::MultiFile;
    }

    if let Some(text) = value.as_str() {
        let is_url = text.starts_with("http://") || text.starts_with("https://");
        if is_url && IMAGE_HINTS.iter().any(|hint| key.contains(hint)) {
            return FieldKind::SingleFile;
        }
    }

    if key.contains("date") {
        return FieldKind::Date;
    }

    let multiline = value.as_str().is_some_and(|text| text.contains('\n'));
    if LONG_TEXT_KEYS.contains(&key.as_str()) || multiline {
        return FieldKind::LongText;
    }

    FieldKind::Text
}

/// `hero_image` -> `Hero Image`
pub fn humanize_key(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Options reduced to bare values
fn normalize_options(options: &Option<Vec<FieldOption>>) -> Option<Vec<FieldOption>> {
    options.as_ref().map(|options| {
        options
            .iter()
            .map(|option| FieldOption {
                key: None,
                value: option.value.clone(),
            })
            .collect()
    })
}

/// Copy of `def` ready to send: field ids assigned, titles and options filled
pub fn prepare_type_definition(def: &TypeDefinition) -> TypeDefinition {
    let mut prepared = def.clone();
    for field in &mut prepared.fields {
        if field.id.as_deref().map_or(true, str::is_empty) {
            field.id = Some(uuid_utils::generate_string());
        }
        if field.title.trim().is_empty() {
            field.title = humanize_key(&field.key);
        }
        if field.kind.has_options() {
            field.options = normalize_options(&field.options);
        } else {
            field.options = None;
        }
        if !field.kind.is_reference() {
            field.referenced_type = None;
        }
    }
    prepared
}

/// Give every field value lacking one a fresh identifier
pub fn ensure_field_ids(fields: &mut [FieldValue]) {
    for field in fields {
        if field.id.as_deref().map_or(true, str::is_empty) {
            field.id = Some(uuid_utils::generate_string());
        }
    }
}

/// Turn a record's field payload into explicit field values
///
/// `declared` holds the target type's fields by key, when the type is known.
pub fn normalize_record_fields(
    fields: &RecordFields,
    declared: Option<&HashMap<String, FieldSpec>>,
) -> Vec<FieldValue> {
    match fields {
        RecordFields::Explicit(values) => values.clone(),
        RecordFields::Flat(map) => normalize_flat(map, declared),
    }
}

fn normalize_flat(
    map: &Map<String, Value>,
    declared: Option<&HashMap<String, FieldSpec>>,
) -> Vec<FieldValue> {
    map.iter()
        .map(|(key, value)| match declared.and_then(|fields| fields.get(key)) {
            Some(spec) => FieldValue {
                id: None,
                key: key.clone(),
                title: Some(spec.title.clone()).filter(|t| !t.is_empty()),
                kind: spec.kind.clone(),
                value: value.clone(),
                referenced_type: spec.referenced_type.clone(),
                options: spec.options.clone(),
            },
            None => {
                let kind = infer_kind(key, value);
                tracing::debug!(key = %key, kind = %kind, "Inferred field kind");
                FieldValue {
                    id: None,
                    key: key.clone(),
                    title: Some(humanize_key(key)),
                    kind,
                    value: value.clone(),
                    referenced_type: None,
                    options: None,
                }
            }
        })
        .collect()
}
