//! # Expression System
//!
//! Deferred computations over named columns. An [`Expr`] is an immutable
//! tree that is validated only when it is evaluated against a DataFrame or a
//! single Series; unknown column names surface as errors at that point.
//!
//! ```ignore
//! use colrs::prelude::*;
//!
//! let out = df.select(&[
//!     col("price").mul(col("qty")).alias("total"),
//!     when(col("qty").gt(lit(10))).then(lit("bulk")).otherwise(lit("retail")).alias("tier"),
//! ])?;
//! ```

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Not, Rem, Sub};
use std::sync::Arc;

use crate::core::any_value::AnyValue;
use crate::core::dtype::DataType;
use crate::core::error::Result;
use crate::series::{RankMethod, RollingOptions, Series};

pub mod eval;
pub mod selectors;

pub use selectors::Selector;

/// Element-wise user function
#[derive(Clone)]
pub struct ElementUdf(pub Arc<dyn Fn(AnyValue) -> Result<AnyValue> + Send + Sync>);

/// Batch user function receiving the whole input Series
#[derive(Clone)]
pub struct SeriesUdf(pub Arc<dyn Fn(&Series) -> Result<Series> + Send + Sync>);

impl fmt::Debug for ElementUdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ElementUdf")
    }
}

impl fmt::Debug for SeriesUdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeriesUdf")
    }
}

/// Represents a literal value in an expression
#[derive(Debug, Clone)]
pub enum LiteralValue {
    /// A scalar, broadcast to the context height
    Scalar(AnyValue),
    /// A whole Series
    Series(Series),
}

/// Types of binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    /// True division
    Divide,
    FloorDivide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// Kleene AND
    And,
    /// Kleene OR
    Or,
    Xor,
}

/// Types of unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    IsNull,
    IsNotNull,
    IsNan,
    IsNotNan,
    Abs,
    Reverse,
    Unique,
    DropNulls,
}

/// Reducers producing a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggExpr {
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Std(u8),
    Var(u8),
    Count,
    NUnique,
    First,
    Last,
}

/// Rolling window reducers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingFunction {
    Min,
    Max,
    Sum,
    Mean,
    Var,
    Std,
    Median,
}

/// Represents an expression evaluated against a DataFrame or Series context
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column reference; `"*"` and `^...$` names expand to several columns
    Column(String),
    /// Several named columns
    Columns(Vec<String>),
    /// Every column whose dtype is in the list
    DtypeColumns(Vec<DataType>),
    /// Every column
    Wildcard,
    /// Column by position; negative positions count from the end
    Nth(i64),
    /// Columns picked by a selector
    Selector(Selector),
    /// Drop names from a multi-column expansion
    Exclude {
        expr: Box<Expr>,
        names: Vec<String>,
    },
    /// Literal value
    Literal(LiteralValue),
    /// Rename the output
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    /// CAST expression
    Cast {
        expr: Box<Expr>,
        data_type: DataType,
        strict: bool,
    },
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    /// Reduction to one row
    Agg {
        func: AggExpr,
        expr: Box<Expr>,
    },
    Sort {
        expr: Box<Expr>,
        reverse: bool,
    },
    Shift {
        expr: Box<Expr>,
        periods: i64,
    },
    FillNull {
        expr: Box<Expr>,
        fill: Box<Expr>,
    },
    Rank {
        expr: Box<Expr>,
        method: RankMethod,
        reverse: bool,
    },
    IsIn {
        expr: Box<Expr>,
        other: Box<Expr>,
    },
    Rolling {
        expr: Box<Expr>,
        func: RollingFunction,
        options: RollingOptions,
    },
    /// Chained `when/then` branches; the first true predicate wins
    Case {
        when_then: Vec<(Expr, Expr)>,
        else_expr: Box<Expr>,
    },
    /// User function called once per element
    Apply {
        expr: Box<Expr>,
        function: ElementUdf,
        return_dtype: Option<DataType>,
        /// Run the callback on the worker pool
        parallel: bool,
    },
    /// User function called once per Series
    Map {
        expr: Box<Expr>,
        function: SeriesUdf,
    },
}

/// Reference a column by name. `"*"` selects every column and a name wrapped
/// in `^` and `$` is matched as a regular expression.
pub fn col(name: &str) -> Expr {
    if name == "*" {
        Expr::Wildcard
    } else {
        Expr::Column(name.to_string())
    }
}

/// Several columns by name
pub fn cols(names: &[&str]) -> Expr {
    Expr::Columns(names.iter().map(|s| s.to_string()).collect())
}

/// Every column of the context
pub fn all() -> Expr {
    Expr::Wildcard
}

/// Every column of the given dtype
pub fn dtype_col(dtype: &DataType) -> Expr {
    Expr::DtypeColumns(vec![dtype.clone()])
}

/// Every column whose dtype is one of `dtypes`
pub fn dtype_cols(dtypes: &[DataType]) -> Expr {
    Expr::DtypeColumns(dtypes.to_vec())
}

/// Column at position `n`; negative positions count from the end
pub fn nth(n: i64) -> Expr {
    Expr::Nth(n)
}

pub fn first() -> Expr {
    Expr::Nth(0)
}

pub fn last() -> Expr {
    Expr::Nth(-1)
}

/// A literal scalar or Series
pub fn lit(value: impl Into<LiteralValue>) -> Expr {
    Expr::Literal(value.into())
}

/// The null literal
pub fn null() -> Expr {
    Expr::Literal(LiteralValue::Scalar(AnyValue::Null))
}

/// Start a conditional expression
pub fn when(predicate: impl Into<Expr>) -> When {
    When {
        when_then: Vec::new(),
        predicate: predicate.into(),
    }
}

/// A predicate awaiting its `then` branch
#[derive(Debug, Clone)]
pub struct When {
    when_then: Vec<(Expr, Expr)>,
    predicate: Expr,
}

/// Completed branches awaiting another `when` or the `otherwise` branch
#[derive(Debug, Clone)]
pub struct Then {
    when_then: Vec<(Expr, Expr)>,
}

impl When {
    pub fn then(mut self, value: impl Into<Expr>) -> Then {
        self.when_then.push((self.predicate, value.into()));
        Then {
            when_then: self.when_then,
        }
    }
}

impl Then {
    /// Add another branch, tried only where earlier predicates were not true
    pub fn when(self, predicate: impl Into<Expr>) -> When {
        When {
            when_then: self.when_then,
            predicate: predicate.into(),
        }
    }

    pub fn otherwise(self, value: impl Into<Expr>) -> Expr {
        Expr::Case {
            when_then: self.when_then,
            else_expr: Box::new(value.into()),
        }
    }
}

/// A `when/then` chain without `otherwise` yields null elsewhere
impl From<Then> for Expr {
    fn from(then: Then) -> Self {
        then.otherwise(null())
    }
}

impl From<AnyValue> for LiteralValue {
    fn from(value: AnyValue) -> Self {
        LiteralValue::Scalar(value)
    }
}

impl From<Series> for LiteralValue {
    fn from(s: Series) -> Self {
        LiteralValue::Series(s)
    }
}

impl From<Selector> for Expr {
    fn from(selector: Selector) -> Self {
        Expr::Selector(selector)
    }
}

impl From<AnyValue> for Expr {
    fn from(value: AnyValue) -> Self {
        lit(value)
    }
}

macro_rules! impl_literal_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for LiteralValue {
                fn from(value: $t) -> Self {
                    LiteralValue::Scalar(AnyValue::from(value))
                }
            }

            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    lit(value)
                }
            }
        )*
    };
}

impl_literal_from!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, &str);

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        LiteralValue::Scalar(AnyValue::Utf8(value))
    }
}

impl Expr {
    fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }

    fn binary(self, op: BinaryOperator, rhs: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: self.boxed(),
            op,
            right: rhs.into().boxed(),
        }
    }

    fn unary(self, op: UnaryOperator) -> Expr {
        Expr::UnaryOp {
            op,
            expr: self.boxed(),
        }
    }

    fn agg(self, func: AggExpr) -> Expr {
        Expr::Agg {
            func,
            expr: self.boxed(),
        }
    }

    fn rolling(self, func: RollingFunction, options: RollingOptions) -> Expr {
        Expr::Rolling {
            expr: self.boxed(),
            func,
            options,
        }
    }

    /// Rename the output column
    pub fn alias(self, name: &str) -> Expr {
        Expr::Alias {
            expr: self.boxed(),
            name: name.to_string(),
        }
    }

    /// Cast, turning unconvertible values into nulls
    pub fn cast(self, data_type: DataType) -> Expr {
        Expr::Cast {
            expr: self.boxed(),
            data_type,
            strict: false,
        }
    }

    /// Cast, failing when a value cannot be converted
    pub fn strict_cast(self, data_type: DataType) -> Expr {
        Expr::Cast {
            expr: self.boxed(),
            data_type,
            strict: true,
        }
    }

    /// Drop `names` from a multi-column expansion
    pub fn exclude(self, names: &[&str]) -> Expr {
        Expr::Exclude {
            expr: self.boxed(),
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn floor_div(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::FloorDivide, rhs)
    }

    pub fn equal(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Equal, rhs)
    }

    pub fn not_equal(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::NotEqual, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::LessThan, rhs)
    }

    pub fn lt_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::LessThanOrEqual, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::GreaterThan, rhs)
    }

    pub fn gt_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::GreaterThanOrEqual, rhs)
    }

    pub fn and(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, rhs)
    }

    pub fn or(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Or, rhs)
    }

    pub fn xor(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Xor, rhs)
    }

    pub fn is_null(self) -> Expr {
        self.unary(UnaryOperator::IsNull)
    }

    pub fn is_not_null(self) -> Expr {
        self.unary(UnaryOperator::IsNotNull)
    }

    pub fn is_nan(self) -> Expr {
        self.unary(UnaryOperator::IsNan)
    }

    pub fn is_not_nan(self) -> Expr {
        self.unary(UnaryOperator::IsNotNan)
    }

    pub fn abs(self) -> Expr {
        self.unary(UnaryOperator::Abs)
    }

    pub fn reverse(self) -> Expr {
        self.unary(UnaryOperator::Reverse)
    }

    pub fn unique(self) -> Expr {
        self.unary(UnaryOperator::Unique)
    }

    pub fn drop_nulls(self) -> Expr {
        self.unary(UnaryOperator::DropNulls)
    }

    pub fn sum(self) -> Expr {
        self.agg(AggExpr::Sum)
    }

    pub fn mean(self) -> Expr {
        self.agg(AggExpr::Mean)
    }

    pub fn min(self) -> Expr {
        self.agg(AggExpr::Min)
    }

    pub fn max(self) -> Expr {
        self.agg(AggExpr::Max)
    }

    pub fn median(self) -> Expr {
        self.agg(AggExpr::Median)
    }

    pub fn std(self, ddof: u8) -> Expr {
        self.agg(AggExpr::Std(ddof))
    }

    pub fn var(self, ddof: u8) -> Expr {
        self.agg(AggExpr::Var(ddof))
    }

    /// Number of non-null values
    pub fn count(self) -> Expr {
        self.agg(AggExpr::Count)
    }

    pub fn n_unique(self) -> Expr {
        self.agg(AggExpr::NUnique)
    }

    pub fn first(self) -> Expr {
        self.agg(AggExpr::First)
    }

    pub fn last(self) -> Expr {
        self.agg(AggExpr::Last)
    }

    pub fn sort(self, reverse: bool) -> Expr {
        Expr::Sort {
            expr: self.boxed(),
            reverse,
        }
    }

    pub fn shift(self, periods: i64) -> Expr {
        Expr::Shift {
            expr: self.boxed(),
            periods,
        }
    }

    /// Replace nulls with a scalar or with the matching rows of another expression
    pub fn fill_null(self, fill: impl Into<Expr>) -> Expr {
        Expr::FillNull {
            expr: self.boxed(),
            fill: fill.into().boxed(),
        }
    }

    pub fn rank(self, method: RankMethod, reverse: bool) -> Expr {
        Expr::Rank {
            expr: self.boxed(),
            method,
            reverse,
        }
    }

    pub fn is_in(self, other: impl Into<Expr>) -> Expr {
        Expr::IsIn {
            expr: self.boxed(),
            other: other.into().boxed(),
        }
    }

    pub fn rolling_min(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Min, options)
    }

    pub fn rolling_max(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Max, options)
    }

    pub fn rolling_sum(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Sum, options)
    }

    pub fn rolling_mean(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Mean, options)
    }

    pub fn rolling_var(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Var, options)
    }

    pub fn rolling_std(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Std, options)
    }

    pub fn rolling_median(self, options: RollingOptions) -> Expr {
        self.rolling(RollingFunction::Median, options)
    }

    /// Call `f` once per element; nulls reach `f` as [`AnyValue::Null`].
    ///
    /// The callback runs on the calling thread unless [`Expr::parallel`]
    /// opts in.
    pub fn apply<F>(self, f: F, return_dtype: Option<DataType>) -> Expr
    where
        F: Fn(AnyValue) -> Result<AnyValue> + Send + Sync + 'static,
    {
        Expr::Apply {
            expr: self.boxed(),
            function: ElementUdf(Arc::new(f)),
            return_dtype,
            parallel: false,
        }
    }

    /// Let an `apply` or rolling node run on the worker pool. Other nodes
    /// are returned unchanged.
    pub fn parallel(self, parallel: bool) -> Expr {
        match self {
            Expr::Apply {
                expr,
                function,
                return_dtype,
                ..
            } => Expr::Apply {
                expr,
                function,
                return_dtype,
                parallel,
            },
            Expr::Rolling {
                expr,
                func,
                options,
            } => Expr::Rolling {
                expr,
                func,
                options: options.parallel(parallel),
            },
            Expr::Alias { expr, name } => Expr::Alias {
                expr: Box::new(expr.parallel(parallel)),
                name,
            },
            other => other,
        }
    }

    /// Call `f` once with the whole evaluated input
    pub fn map<F>(self, f: F) -> Expr
    where
        F: Fn(&Series) -> Result<Series> + Send + Sync + 'static,
    {
        Expr::Map {
            expr: self.boxed(),
            function: SeriesUdf(Arc::new(f)),
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                self.binary($op, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOperator::Add);
impl_binary_op!(Sub, sub, BinaryOperator::Subtract);
impl_binary_op!(Mul, mul, BinaryOperator::Multiply);
impl_binary_op!(Div, div, BinaryOperator::Divide);
impl_binary_op!(Rem, rem, BinaryOperator::Modulo);
impl_binary_op!(BitAnd, bitand, BinaryOperator::And);
impl_binary_op!(BitOr, bitor, BinaryOperator::Or);

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.unary(UnaryOperator::Not)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::FloorDivide => "//",
            Self::Modulo => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "col({})", name),
            Self::Columns(names) => write!(f, "cols({})", names.join(", ")),
            Self::DtypeColumns(dtypes) => write!(f, "dtype_cols({:?})", dtypes),
            Self::Wildcard => write!(f, "*"),
            Self::Nth(n) => write!(f, "nth({})", n),
            Self::Selector(s) => write!(f, "{}", s),
            Self::Exclude { expr, names } => write!(f, "{}.exclude({})", expr, names.join(", ")),
            Self::Literal(LiteralValue::Scalar(v)) => write!(f, "lit({})", v),
            Self::Literal(LiteralValue::Series(s)) => write!(f, "lit(Series[{}])", s.name()),
            Self::Alias { expr, name } => write!(f, "{}.alias({})", expr, name),
            Self::Cast { expr, data_type, strict } => {
                let kind = if *strict { "strict_cast" } else { "cast" };
                write!(f, "{}.{}({})", expr, kind, data_type)
            }
            Self::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Self::UnaryOp { op, expr } => write!(f, "{}.{:?}()", expr, op),
            Self::Agg { func, expr } => write!(f, "{}.{:?}()", expr, func),
            Self::Sort { expr, reverse } => write!(f, "{}.sort(reverse={})", expr, reverse),
            Self::Shift { expr, periods } => write!(f, "{}.shift({})", expr, periods),
            Self::FillNull { expr, fill } => write!(f, "{}.fill_null({})", expr, fill),
            Self::Rank { expr, method, .. } => write!(f, "{}.rank({:?})", expr, method),
            Self::IsIn { expr, other } => write!(f, "{}.is_in({})", expr, other),
            Self::Rolling { expr, func, options } => {
                write!(f, "{}.rolling_{:?}({})", expr, func, options.window_size)
            }
            Self::Case { when_then, else_expr } => {
                for (i, (pred, then)) in when_then.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "when({}).then({})", pred, then)?;
                }
                write!(f, ".otherwise({})", else_expr)
            }
            Self::Apply { expr, .. } => write!(f, "{}.apply()", expr),
            Self::Map { expr, .. } => write!(f, "{}.map()", expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = when(col("a").gt(1)).then(col("b") * 2).otherwise(lit(0));
        assert_eq!(
            e.to_string(),
            "when((col(a) > lit(1))).then((col(b) * lit(2))).otherwise(lit(0))"
        );
        assert!(matches!(col("*"), Expr::Wildcard));
    }
}
