//! Tool schemas, argument normalization and dispatch routing
//!
//! ```text
//! model proposal ──> ArgumentNormalizer ──> SchemaRegistry::validate ──> DispatchRoute
//!                     (aliases, sheet         (required fields)           Create | BatchCreate
//!                      lists, file paths)                                 Rename | Generic
//! ```

mod dispatch;
mod normalizer;
mod registry;

pub use dispatch::DispatchRoute;
pub use normalizer::{canonical_key, coerce_sheet_names, ArgumentNormalizer};
pub use registry::{SchemaError, SchemaRegistry, SchemaResult, ToolSchema};
