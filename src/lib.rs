//! colrs: a columnar DataFrame engine
//!
//! Columns are typed [`Series`] backed by chunked storage with validity
//! bitmaps. A [`DataFrame`] is an ordered set of equal-length Series and is
//! transformed through [`Expr`] trees, joins, group-by and pivot tables.
//! Arrow interchange is available behind the `arrow` feature.

#![allow(clippy::too_many_arguments)]

// Core module with fundamental data structures and traits
pub mod core;

pub mod column;
pub mod config;
pub mod dataframe;
pub mod expr;
pub mod groupby;
pub mod io;
pub mod parallel;
pub mod pivot;
pub mod series;

#[cfg(feature = "arrow")]
pub mod arrow_integration;

pub use crate::core::any_value::AnyValue;
pub use crate::core::dtype::{DataType, Field, IdxSize, TimeUnit};
pub use crate::core::error::{Error, Result};
pub use column::ChunkedArray;
pub use config::EngineConfig;
pub use dataframe::{DataFrame, JoinExt, JoinType, Orientation};
pub use expr::{col, lit, when, Expr, Selector};
pub use groupby::{AggFunction, GroupBy};
pub use io::{read_csv, read_json, write_csv, write_json, CodecRegistry, FileCodec, ReadOptions};
pub use pivot::PivotTable;
pub use series::Series;

/// Common imports for working with DataFrames and expressions
pub mod prelude {
    pub use crate::core::any_value::AnyValue;
    pub use crate::core::dtype::{DataType, Field, IdxSize, TimeUnit};
    pub use crate::core::error::{Error, Result};
    pub use crate::dataframe::{DataFrame, JoinExt, JoinType, Orientation};
    pub use crate::expr::selectors::DtypeClass;
    pub use crate::expr::{
        all, col, cols, dtype_col, dtype_cols, first, last, lit, nth, null, when, Expr,
        Selector,
    };
    pub use crate::groupby::{AggFunction, GroupBy};
    pub use crate::io::{read_csv, read_json, write_csv, write_json, CodecRegistry, FileCodec, ReadOptions};
    pub use crate::pivot::PivotTable;
    pub use crate::series::{
        ConstructOptions, FillNullStrategy, RankMethod, RollingOptions, Series, SeriesInput,
    };
}

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
