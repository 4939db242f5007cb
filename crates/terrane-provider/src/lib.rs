//! Terrane provider framework
//!
//! This crate provides the provider-side building blocks for Terrane,
//! enabling declarative management of cloud resources through typed
//! lifecycle implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 apply / import                   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │              terrane-provider                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │        Lifecycle Abstraction              │   │
//! │  │  trait ManagedResource { ... }            │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Retry Policy │  │  State Store │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │   alicloud    │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod error;
pub mod identity;
pub mod resource;
pub mod retry;
pub mod state;

// Re-exports
pub use error::{IdentityError, RetryError, StateError};
pub use identity::{CompositeId, ID_SEPARATOR};
pub use resource::{ActionKind, ManagedResource, Observed, ReconcileOutcome, reconcile};
pub use retry::RetryPolicy;
pub use state::{ResourceRecord, StateDocument, StateStore};
