//! Type creation

use super::field_inference::prepare_type_definition;
use crate::models::{InstallOutcome, InstallSummary, TypeDefinition};
use crate::services::BackendGateway;
use std::collections::HashSet;

/// What the type phase left behind
#[derive(Debug, Default)]
pub struct TypePhaseResult {
    /// Definitions the backend accepted
    pub created: Vec<TypeDefinition>,
    /// Slugs whose creation hard-failed
    pub failed: HashSet<String>,
}

/// Create each type in order
///
/// Sequential on purpose: records installed later depend on these types.
pub async fn install_types(
    gateway: &dyn BackendGateway,
    defs: &[TypeDefinition],
    summary: &mut InstallSummary,
) -> TypePhaseResult {
    let mut result = TypePhaseResult::default();

    for def in defs {
        let prepared = prepare_type_definition(def);
        let slug = prepared.effective_slug();

        let outcome = match gateway.create_type(&prepared).await {
            Ok(mut returned) => {
                // Some responses omit metafields; keep what was sent
                if returned.fields.is_empty() {
                    returned.fields = prepared.fields.clone();
                }
                if returned.slug.as_deref().map_or(true, str::is_empty) {
                    returned.slug = Some(slug.clone());
                }
                tracing::info!(slug = %slug, title = %def.title, "Created type");
                result.created.push(returned);
                InstallOutcome::Created
            }
            Err(e) if e.is_duplicate() => {
                tracing::info!(slug = %slug, "Type already exists, skipping");
                InstallOutcome::SkippedDuplicate
            }
            Err(e) => {
                tracing::warn!(slug = %slug, error = %e, "Failed to create type");
                result.failed.insert(def.effective_slug());
                result.failed.insert(slug.clone());
                InstallOutcome::Failed(e.to_string())
            }
        };

        summary.add_type_outcome(&def.title, outcome);
    }

    result
}
