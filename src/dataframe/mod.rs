// DataFrame implementations module
pub mod base;
pub mod construction;
pub mod join;

// Re-exports for convenience
pub use base::DataFrame;
pub use construction::Orientation;
pub use join::{JoinExt, JoinType};
