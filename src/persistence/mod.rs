//! Persistence boundary.
//!
//! The connector never owns storage. It reaches entities through the
//! `EntityLoader` collaborator, and only at two points: explicit pre-commit
//! preloads and nothing else.
//!
//! # Data Flow
//! ```text
//! Command result (Data tree with unloaded entities)
//!     → loader.rs (preload atoms / aggregates, before serialization)
//!     → serializers (read already-loaded attributes only)
//!
//! Manifest / describe / help
//!     → context.rs detached() (all loads become no-ops)
//! ```
//!
//! # Design Decisions
//! - Serializers never call the loader; load-then-serialize is enforced by
//!   running preloads as pre-commit transformers
//! - Detached state is thread-local; each dispatch runs on one worker

pub mod context;
pub mod loader;

pub use context::{detached, is_detached};
pub use loader::{load, preload, EntityLoader, Preload};
