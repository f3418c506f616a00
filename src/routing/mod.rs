//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request (method, prefixless path)
//!     → action.rs (OPTIONS / run / describe / help / manifest / list / describe_type)
//!     → connector dispatches on the resolved Action
//!     → status.rs (outcome → HTTP status)
//! ```
//!
//! # Design Decisions
//! - Path grammar is fixed: `/<action>/<segment>/...`, segments joined with `::`
//! - Status mapping is a total function over the closed error categories
//! - No regex: one split, cached on the request

pub mod action;
pub mod status;

pub use action::Action;
pub use status::status_for;
