//! # gov-engine — Rules Engine
//!
//! Maintains the registry of validated policies and evaluates resources
//! against it.
//!
//! ## Matching
//!
//! A resource is evaluated against every policy whose
//! `spec.target.resourceType` equals the resource's `type` exactly. A
//! resource no policy targets passes with an empty violation list.
//!
//! ## Failure Model
//!
//! A rule whose condition is `false`, fails to evaluate, or never compiled
//! produces a [`Violation`]. None of these abort evaluation of sibling
//! rules or other resources.
//!
//! ## Concurrency
//!
//! [`RulesEngine`] is `Send + Sync`. Readers share a `parking_lot::RwLock`
//! over the registry and never block each other; registration swaps whole
//! `Arc<CompiledPolicy>` entries. [`RulesEngine::evaluate_batch`] fans a
//! batch out over scoped threads.
//!
//! The engine is an owned value: construct one per registry and pass it
//! to callers. There is no global instance.

pub mod compiled;
pub mod engine;
pub mod error;
pub mod result;

pub use compiled::{CompiledPolicy, CompiledRule};
pub use engine::{Registration, RulesEngine};
pub use error::{EngineError, RegistrationError};
pub use result::{EvaluationResult, Violation};
