pub mod config_artifact;
pub mod module_catalog;
pub mod provisioner;
pub mod provisioning_queue;
pub mod tenant_databases;
pub mod tenant_directory;
pub mod tenant_service;

pub use config_artifact::{ArtifactError, ArtifactStore, TenantConfigArtifact};
pub use module_catalog::{CatalogError, ModuleCatalog, PgModuleCatalog};
pub use provisioner::{ProvisionError, ProvisionReport, ProvisionRequest, TenantProvisioner};
pub use provisioning_queue::{JobState, ProvisioningJob, ProvisioningQueue, QueueError};
pub use tenant_databases::{PgTenantDatabases, TenantDatabases};
pub use tenant_directory::{PgTenantDirectory, TenantDirectory};
pub use tenant_service::{TenantService, TenantServiceError};
