//! Type and record definitions
//!
//! These mirror the backend's wire shapes closely enough to be sent as-is,
//! while accepting the looser spellings produced by upstream extraction
//! (`fields` for `metafields`, `referencedType` for `object_type`, plain
//! strings for select options).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared data shape of one field
///
/// Wire names follow the backend (`textarea`, `switch`, `object`, ...);
/// descriptive aliases (`long-text`, `boolean`, `single-reference`, ...) are
/// accepted on input. Unknown kinds are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    LongText,
    Date,
    Boolean,
    SingleFile,
    MultiFile,
    SingleReference,
    MultiReference,
    Select,
    Checkbox,
    Radio,
    Other(String),
}

impl FieldKind {
    /// Backend wire name
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "textarea",
            FieldKind::Date => "date",
            FieldKind::Boolean => "switch",
            FieldKind::SingleFile => "file",
            FieldKind::MultiFile => "files",
            FieldKind::SingleReference => "object",
            FieldKind::MultiReference => "objects",
            FieldKind::Select => "select-dropdown",
            FieldKind::Checkbox => "check-boxes",
            FieldKind::Radio => "radio-buttons",
            FieldKind::Other(name) => name,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::SingleReference | FieldKind::MultiReference)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::SingleFile | FieldKind::MultiFile)
    }

    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Checkbox | FieldKind::Radio)
    }
}

impl From<String> for FieldKind {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => FieldKind::Text,
            "textarea" | "long-text" | "html-textarea" | "markdown" => FieldKind::LongText,
            "date" => FieldKind::Date,
            "switch" | "boolean" => FieldKind::Boolean,
            "file" | "single-file" => FieldKind::SingleFile,
            "files" | "multi-file" => FieldKind::MultiFile,
            "object" | "single-reference" => FieldKind::SingleReference,
            "objects" | "multi-reference" => FieldKind::MultiReference,
            "select-dropdown" | "select" => FieldKind::Select,
            "check-boxes" | "checkbox" => FieldKind::Checkbox,
            "radio-buttons" | "radio" => FieldKind::Radio,
            _ => FieldKind::Other(name),
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One choice of a select/checkbox/radio field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct FieldOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Plain(String),
    Object {
        #[serde(default)]
        key: Option<String>,
        value: String,
    },
}

impl From<RawOption> for FieldOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Plain(value) => FieldOption { key: None, value },
            RawOption::Object { key, value } => FieldOption { key, value },
        }
    }
}

/// Field declared by a type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(
        default,
        rename = "object_type",
        alias = "referencedType",
        alias = "referenced_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub referenced_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

/// Schema for one kind of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(
        default,
        rename = "singular",
        alias = "singularLabel",
        skip_serializing_if = "Option::is_none"
    )]
    pub singular_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(
        default,
        rename = "singleton",
        alias = "isSingleton",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_singleton: Option<bool>,
    #[serde(default, rename = "metafields", alias = "fields")]
    pub fields: Vec<FieldSpec>,
}

impl TypeDefinition {
    /// Slug the backend will use for this type
    pub fn effective_slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => cmsc_common::slugify(&self.title),
        }
    }
}

/// Publication status of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Published,
    Draft,
}

/// One field value of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub value: Value,
    #[serde(
        default,
        rename = "object_type",
        alias = "referencedType",
        alias = "referenced_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub referenced_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

/// Record field payload: explicit field values or a flat key/value map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordFields {
    Explicit(Vec<FieldValue>),
    Flat(Map<String, Value>),
}

impl Default for RecordFields {
    fn default() -> Self {
        RecordFields::Flat(Map::new())
    }
}

/// Record to install
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDefinition {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub type_slug: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, rename = "metafields", alias = "fields")]
    pub fields: RecordFields,
}

impl RecordDefinition {
    /// Requested slug, or one generated from the title
    pub fn effective_slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => cmsc_common::slugify(&self.title),
        }
    }
}

/// Batch of definitions handed to the installer
///
/// This is the output contract of upstream extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    #[serde(default, alias = "object_types", alias = "objectTypes")]
    pub types: Vec<TypeDefinition>,
    #[serde(default, alias = "objects")]
    pub records: Vec<RecordDefinition>,
}

/// Create-record request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub title: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub type_slug: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub metafields: Vec<FieldValue>,
}

/// Record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub type_slug: Option<String>,
}
