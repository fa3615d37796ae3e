//! # Engine Errors
//!
//! Registration and input-decoding failures. A failing rule is never an
//! error; it is a [`Violation`](crate::Violation).

use thiserror::Error;

/// Why a policy was not registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// `metadata.name` is empty.
    #[error("policy has no identity (metadata.name is empty)")]
    MissingIdentity,

    /// `spec.target.resourceType` is empty.
    #[error("policy '{policy_id}' has no target resource type")]
    MissingResourceType {
        /// The policy's name.
        policy_id: String,
    },

    /// The document does not decode into a policy.
    #[error("malformed policy document: {0}")]
    Malformed(String),
}

/// Errors from the rules engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A policy could not be registered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A resource document does not decode into a resource.
    #[error("malformed resource document: {0}")]
    InvalidResource(String),
}
