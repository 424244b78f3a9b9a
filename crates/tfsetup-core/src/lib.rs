//! Shared value types for the tfsetup workspace.
//!
//! Everything here is a pure, immutable value object: toolchain versions and
//! the constraint algebra over them, the module-facts input contract, the
//! discovery-source seam, and the fatal error taxonomy. Network and
//! filesystem concerns live in the sibling crates.

mod constraint;
mod error;
mod facts;
mod product;
mod source;
mod version;

pub use constraint::{Constraint, ConstraintOp, ConstraintParseError, apply_constraints};
pub use error::ResolveError;
pub use facts::ModuleFacts;
pub use product::Product;
pub use source::{DiscoveryResult, ResolveContext, VersionSource};
pub use version::{
    Version, VersionComponent, VersionParseError, earliest, earliest_non_prerelease, latest,
    latest_non_prerelease,
};
