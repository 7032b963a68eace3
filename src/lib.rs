//! Catalog worker - library catalog jobs for a job-queue runner.
//!
//! Each job descriptor names one operation (checkout, return, search) and
//! carries the caller's credentials as a sealed token. The worker opens the
//! token, checks the caller's role against a fixed permission matrix, and
//! only then touches the inventory or the catalog search service.
//!
//! # Pipeline
//!
//! ```text
//! JobDescriptor ──► CredentialVault ──► AuthorizationGate ──► dispatch ──► ResultEnvelope
//!                   (decrypt)           (role → ops)          │
//!                                                             ├─ InventoryHandler (checkout/return)
//!                                                             └─ CatalogSearchClient (Open Library)
//! ```
//!
//! Jobs are processed one at a time. The key, permission matrix and HTTP
//! client are built once at startup and only read afterwards.

/// Credential vault and authorization gate.
pub mod auth;

/// Startup configuration.
pub mod config;

/// Job descriptor and result envelope types.
pub mod job;

/// Job worker and its handlers.
pub mod worker;

pub use auth::{AuthorizationGate, CredentialVault, Credentials, PermissionMatrix, Role, VaultKey};
pub use config::{ConfigError, WorkerConfig};
pub use job::{EnvelopeStatus, JobDescriptor, Operation, ResultEnvelope};
pub use worker::{CatalogSearchClient, InventoryHandler, JobError, JobWorker, SimulatedInventory};
