//! Job worker: takes one job descriptor from sealed credentials to a
//! result envelope.
//!
//! Every job runs through the same stages, strictly in order:
//! 1. Decrypt the caller's credentials
//! 2. Extract the role (`member` when absent)
//! 3. Authorize the operation against the permission matrix
//! 4. Dispatch to the inventory handler or the catalog search client
//! 5. Wrap the outcome in a [`ResultEnvelope`]
//!
//! The first failing stage ends the job. A denied role never reaches a
//! handler, and a token that cannot be opened never reaches the gate.

pub mod inventory;
pub mod search;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthorizationGate, CredentialVault, VaultError};
use crate::config::{ConfigError, WorkerConfig};
use crate::job::descriptor::{operation_label, UNKNOWN_OPERATION};
use crate::job::{DescriptorError, JobDescriptor, Operation, ResultEnvelope};

pub use inventory::{InventoryHandler, SimulatedInventory};
pub use search::{CatalogSearchClient, SearchOutcome, SearchResultRecord, SEARCH_FAILURE_MESSAGE};

/// Envelope message used when a credential token cannot be opened.
pub const DECRYPTION_FAILURE_MESSAGE: &str = "Credential decryption failed";

/// Fatal per-job errors.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("credential decryption failed: {0}")]
    Decryption(#[from] VaultError),
}

impl JobError {
    /// Message for the failure envelope. Vault details stay in the logs.
    fn envelope_message(&self) -> String {
        match self {
            JobError::Descriptor(e) => e.to_string(),
            JobError::Decryption(_) => DECRYPTION_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Processes job descriptors one at a time.
pub struct JobWorker {
    vault: CredentialVault,
    gate: AuthorizationGate,
    search: CatalogSearchClient,
    inventory: Arc<dyn InventoryHandler>,
}

impl JobWorker {
    /// Create a worker backed by the simulated inventory.
    pub fn new(config: WorkerConfig) -> Result<Self, ConfigError> {
        Self::with_inventory(config, Arc::new(SimulatedInventory))
    }

    /// Create a worker with a specific inventory handler.
    pub fn with_inventory(
        config: WorkerConfig,
        inventory: Arc<dyn InventoryHandler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let search = CatalogSearchClient::new(&config.search_url, config.search_timeout)?;

        info!(
            search_url = %search.endpoint(),
            timeout_ms = config.search_timeout.as_millis(),
            "Job worker initialized"
        );

        Ok(Self {
            vault: CredentialVault::new(config.key),
            gate: AuthorizationGate::new(config.permissions),
            search,
            inventory,
        })
    }

    /// Run one job, returning typed errors for the fatal stages.
    pub async fn process(&self, job: JobDescriptor) -> Result<ResultEnvelope, JobError> {
        let operation = job.operation;

        let credentials = self.vault.decrypt(&job.encrypted_credentials)?;
        let role = credentials.role();
        debug!(operation = %operation, role = %role, "Credentials decrypted");

        if !self.gate.is_allowed(operation, &role) {
            warn!(
                operation = %operation,
                role = %role,
                allowed = ?self.gate.allowed(&role),
                "Operation not allowed for role"
            );
            return Ok(ResultEnvelope::denied(operation, &role));
        }

        info!(operation = %operation, role = %role, "Executing job");

        let envelope = match operation {
            Operation::Checkout => {
                let ok = self.inventory.checkout(&job.data_to_process).await;
                ResultEnvelope::success(
                    operation,
                    if ok { "Checkout successful" } else { "Checkout failed" },
                )
            }
            Operation::Return => {
                let ok = self.inventory.return_item(&job.data_to_process).await;
                ResultEnvelope::success(
                    operation,
                    if ok { "Return successful" } else { "Return failed" },
                )
            }
            Operation::Search => {
                let query = job.search_query()?;
                let outcome = self.search.search(&query).await;
                if outcome.is_success() {
                    ResultEnvelope::search_success(outcome.results)
                } else {
                    ResultEnvelope::failure(
                        operation.to_string(),
                        outcome
                            .message
                            .unwrap_or_else(|| SEARCH_FAILURE_MESSAGE.to_string()),
                    )
                }
            }
        };

        info!(operation = %operation, status = ?envelope.status, "Job completed");

        Ok(envelope)
    }

    /// Run one job; fatal errors become failure envelopes.
    pub async fn run(&self, job: JobDescriptor) -> ResultEnvelope {
        let operation = job.operation;

        match self.process(job).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(operation = %operation, error = %e, "Job failed");
                ResultEnvelope::failure(operation.to_string(), e.envelope_message())
            }
        }
    }

    /// Validate a raw descriptor and run it.
    ///
    /// Rejected descriptors echo whatever operation text they carried.
    pub async fn run_value(&self, raw: Value) -> ResultEnvelope {
        let label = operation_label(&raw);

        match JobDescriptor::from_value(raw) {
            Ok(job) => self.run(job).await,
            Err(e) => {
                let e = JobError::from(e);
                error!(operation = %label, error = %e, "Rejected job descriptor");
                ResultEnvelope::failure(label, e.envelope_message())
            }
        }
    }

    /// Run one entry produced by [`read_batch`](crate::job::read_batch).
    ///
    /// Input that was not JSON at all has no operation to echo and is
    /// reported as `unknown`.
    pub async fn run_entry(&self, entry: Result<Value, DescriptorError>) -> ResultEnvelope {
        match entry {
            Ok(raw) => self.run_value(raw).await,
            Err(e) => {
                let e = JobError::from(e);
                error!(operation = %UNKNOWN_OPERATION, error = %e, "Rejected job input");
                ResultEnvelope::failure(UNKNOWN_OPERATION, e.envelope_message())
            }
        }
    }
}

impl fmt::Debug for JobWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobWorker")
            .field("gate", &self.gate)
            .field("search", &self.search.endpoint().as_str())
            .finish_non_exhaustive()
    }
}
