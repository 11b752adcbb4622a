//! Content installation
//!
//! Installs a batch of type and record definitions into a backend that has
//! no transactions or foreign keys:
//!
//! 1. list existing types, then create new ones sequentially
//! 2. index every known type's fields
//! 3. create records, fewest-references first, inferring missing field kinds
//! 4. patch slug references to backend ids
//!
//! Per-item failures are counted in the returned [`InstallSummary`]; only
//! setup failures abort the call.

pub mod field_inference;
pub mod media;
pub mod phase_index;
pub mod phase_records;
pub mod phase_types;
pub mod reference_resolver;

pub use media::{ImageHosts, ImageSource};
pub use phase_index::MetafieldIndex;
pub use reference_resolver::{InstalledRecord, ReferenceMap, ReferenceResolver};

use crate::error::InstallError;
use crate::models::{ContentBundle, InstallSummary, RecordDefinition, TypeDefinition};
use crate::services::{BackendGateway, GatewayError, MediaUploader};
use phase_records::RecordInstaller;

/// Hosts whose images are copied into the asset store
pub const STOCK_PHOTO_HOSTS: &[&str] =
    &["images.unsplash.com", "plus.unsplash.com", "images.pexels.com"];

/// Hosts serving the backend's own assets
pub const ASSET_HOSTS: &[&str] = &["cdn.cmsc.dev", "imgix.cmsc.dev"];

/// Installer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    /// Substituted when an image upload fails
    pub default_asset: Option<String>,
    pub image_hosts: ImageHosts,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            default_asset: None,
            image_hosts: ImageHosts {
                stock_hosts: STOCK_PHOTO_HOSTS.iter().map(|h| h.to_string()).collect(),
                asset_hosts: ASSET_HOSTS.iter().map(|h| h.to_string()).collect(),
            },
        }
    }
}

/// Installs definition batches through an explicit gateway and uploader
pub struct ContentInstaller<'a> {
    gateway: &'a dyn BackendGateway,
    uploader: &'a dyn MediaUploader,
    settings: InstallSettings,
}

impl<'a> ContentInstaller<'a> {
    pub fn new(
        gateway: &'a dyn BackendGateway,
        uploader: &'a dyn MediaUploader,
        settings: InstallSettings,
    ) -> Self {
        Self {
            gateway,
            uploader,
            settings,
        }
    }

    pub async fn install_bundle(
        &self,
        bundle: &ContentBundle,
    ) -> Result<InstallSummary, InstallError> {
        self.install(&bundle.types, &bundle.records).await
    }

    /// Install `types` then `records`, then resolve references
    pub async fn install(
        &self,
        types: &[TypeDefinition],
        records: &[RecordDefinition],
    ) -> Result<InstallSummary, InstallError> {
        if self.gateway.bucket().trim().is_empty() {
            return Err(InstallError::NoTarget);
        }

        tracing::info!(
            bucket = %self.gateway.bucket(),
            types = types.len(),
            records = records.len(),
            "Starting content install"
        );

        let mut summary = InstallSummary::default();

        // Listed up front so an unreachable backend fails before any write
        let listed = match self.gateway.list_types().await {
            Ok(listed) => Some(listed),
            Err(GatewayError::Network(message)) => {
                return Err(InstallError::Unreachable(message));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not list existing types, using batch definitions only");
                None
            }
        };

        let type_phase = phase_types::install_types(self.gateway, types, &mut summary).await;
        let index = MetafieldIndex::build(listed, &type_phase.created, types, type_phase.failed);

        let mut refs = ReferenceMap::new();
        let mut installed = if records.is_empty() {
            Vec::new()
        } else {
            RecordInstaller {
                gateway: self.gateway,
                uploader: self.uploader,
                settings: &self.settings,
                index: &index,
            }
            .install(records, &mut summary, &mut refs)
            .await
        };

        if !installed.is_empty() {
            ReferenceResolver::new(self.gateway, refs)
                .resolve(&mut installed)
                .await;
        }

        tracing::info!(summary = %summary.display_string(), "Content install finished");
        Ok(summary)
    }
}
