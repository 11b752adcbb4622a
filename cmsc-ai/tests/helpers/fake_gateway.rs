//! In-memory backend for installer tests
//!
//! Reports duplicates consistently, assigns 24-hex ids like the real backend,
//! and records every call so tests can assert on traffic.

use async_trait::async_trait;
use cmsc_ai::models::{FieldValue, NewRecord, RemoteRecord, TypeDefinition};
use cmsc_ai::services::{BackendGateway, GatewayError};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

/// One gateway call, in order of arrival
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateType(String),
    ListTypes,
    CreateRecord(String),
    FindBySlug(String),
    Patch(String),
}

#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub type_slug: String,
    pub metafields: Vec<FieldValue>,
}

#[derive(Default)]
struct State {
    types: Vec<TypeDefinition>,
    records: Vec<StoredRecord>,
    calls: Vec<Call>,
    next_id: u64,
    failing_types: HashSet<String>,
    failing_records: HashSet<String>,
    list_error: Option<GatewayError>,
    fail_patches: bool,
    strip_created_fields: bool,
}

pub struct FakeGateway {
    bucket: String,
    state: Mutex<State>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::with_bucket("test-bucket")
    }

    pub fn with_bucket(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Pre-existing type, present before any install
    pub fn seed_type(&self, def: TypeDefinition) {
        let mut def = def;
        def.slug = Some(def.effective_slug());
        self.state.lock().unwrap().types.push(def);
    }

    /// Pre-existing record; returns its id
    pub fn seed_record(&self, slug: &str, title: &str, type_slug: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state);
        state.records.push(StoredRecord {
            id: id.clone(),
            slug: slug.to_string(),
            title: title.to_string(),
            type_slug: type_slug.to_string(),
            metafields: Vec::new(),
        });
        id
    }

    /// Make `create_type` fail with a validation error for this title
    pub fn fail_type(&self, title: &str) {
        self.state.lock().unwrap().failing_types.insert(title.to_string());
    }

    /// Make `create_record` fail with a validation error for this slug
    pub fn fail_record(&self, slug: &str) {
        self.state.lock().unwrap().failing_records.insert(slug.to_string());
    }

    pub fn fail_list_types(&self, error: GatewayError) {
        self.state.lock().unwrap().list_error = Some(error);
    }

    pub fn fail_patches(&self) {
        self.state.lock().unwrap().fail_patches = true;
    }

    /// Answer `create_type` without metafields, as some backends do
    pub fn strip_created_fields(&self) {
        self.state.lock().unwrap().strip_created_fields = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn types(&self) -> Vec<TypeDefinition> {
        self.state.lock().unwrap().types.clone()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn record(&self, slug: &str) -> Option<StoredRecord> {
        self.records().into_iter().find(|r| r.slug == slug)
    }

    pub fn field(&self, slug: &str, key: &str) -> Option<FieldValue> {
        self.record(slug)?
            .metafields
            .into_iter()
            .find(|field| field.key == key)
    }

    pub fn field_value(&self, slug: &str, key: &str) -> Option<Value> {
        self.field(slug, key).map(|field| field.value)
    }
}

fn next_id(state: &mut State) -> String {
    state.next_id += 1;
    format!("{:024x}", 0xabc0_0000_u64 + state.next_id)
}

fn validation_error(message: &str) -> GatewayError {
    GatewayError::Api {
        status: 422,
        message: message.to_string(),
    }
}

#[async_trait]
impl BackendGateway for FakeGateway {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_type(&self, def: &TypeDefinition) -> Result<TypeDefinition, GatewayError> {
        let mut state = self.state.lock().unwrap();
        let slug = def.effective_slug();
        state.calls.push(Call::CreateType(slug.clone()));

        if state.failing_types.contains(&def.title) {
            return Err(validation_error("Invalid metafield configuration"));
        }
        if state.types.iter().any(|t| t.effective_slug() == slug) {
            return Err(GatewayError::Api {
                status: 400,
                message: format!("Object type slug '{}' already used", slug),
            });
        }

        let mut stored = def.clone();
        stored.slug = Some(slug);
        state.types.push(stored.clone());

        if state.strip_created_fields {
            stored.fields.clear();
        }
        Ok(stored)
    }

    async fn list_types(&self) -> Result<Vec<TypeDefinition>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListTypes);
        match state.list_error.take() {
            Some(error) => Err(error),
            None => Ok(state.types.clone()),
        }
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RemoteRecord, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateRecord(record.slug.clone()));

        if state.failing_records.contains(&record.slug) {
            return Err(validation_error("Metafield value is invalid"));
        }
        if !state.types.iter().any(|t| t.effective_slug() == record.type_slug) {
            return Err(validation_error("Object type not found"));
        }
        if state.records.iter().any(|r| r.slug == record.slug) {
            return Err(GatewayError::Api {
                status: 409,
                message: "An object with this slug already exists".to_string(),
            });
        }

        let id = next_id(&mut state);
        state.records.push(StoredRecord {
            id: id.clone(),
            slug: record.slug.clone(),
            title: record.title.clone(),
            type_slug: record.type_slug.clone(),
            metafields: record.metafields.clone(),
        });

        Ok(RemoteRecord {
            id,
            slug: record.slug.clone(),
            title: Some(record.title.clone()),
            type_slug: Some(record.type_slug.clone()),
        })
    }

    async fn find_records_by_slug(
        &self,
        slug: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FindBySlug(slug.to_string()));

        Ok(state
            .records
            .iter()
            .filter(|r| r.slug == slug)
            .take(limit)
            .map(|r| RemoteRecord {
                id: r.id.clone(),
                slug: r.slug.clone(),
                title: Some(r.title.clone()),
                type_slug: Some(r.type_slug.clone()),
            })
            .collect())
    }

    async fn patch_record(&self, id: &str, fields: &[FieldValue]) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Patch(id.to_string()));

        if state.fail_patches {
            return Err(GatewayError::Network("connection reset".to_string()));
        }

        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        record.metafields = fields.to_vec();
        Ok(())
    }
}
