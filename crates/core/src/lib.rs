//! # Coupler Core
//!
//! Domain types, traits, and error definitions for the Coupler request router.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The model boundary is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping LLM backends via configuration
//! - Deterministic fakes in tests
//! - Clean dependency graph (all crates depend inward on core)

pub mod assignment;
pub mod error;
pub mod message;
pub mod provider;
pub mod structured;
pub mod team;

// Re-export key types at crate root for ergonomics
pub use assignment::Assignment;
pub use error::{CouplerError, Error, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat};
pub use structured::{OutputSchema, StructuredModel, StructuredOutput, complete_as};
pub use team::{TeamMember, TeamRoster, TeamRosterBuilder, UNKNOWN_TEAM_MEMBER};
