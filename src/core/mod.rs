// Core types shared by every layer of the engine
pub mod any_value;
pub mod bitmap;
pub mod dtype;
pub mod error;

// Re-exports for convenience
pub use any_value::{AnyValue, ObjectValue};
pub use bitmap::{Bitmap, MutableBitmap};
pub use dtype::{get_supertype, CastKind, DataType, Field, IdxSize, TimeUnit, IDX_DTYPE};
pub use error::{Error, Result};
