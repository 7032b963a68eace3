//! Job types for the catalog worker.
//!
//! A job arrives as a loosely-shaped JSON descriptor and is validated once
//! at ingress into a typed [`JobDescriptor`]. Every job ends in exactly one
//! [`ResultEnvelope`].

pub mod descriptor;
pub mod envelope;

pub use descriptor::{read_batch, DescriptorError, JobDescriptor, Operation};
pub use envelope::{EnvelopeStatus, ResultEnvelope};
