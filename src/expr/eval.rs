//! Expression evaluation against a DataFrame context

use std::collections::HashSet;

use regex::Regex;

use crate::core::any_value::AnyValue;
use crate::core::dtype::IdxSize;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::expr::{AggExpr, BinaryOperator, Expr, LiteralValue, RollingFunction, UnaryOperator};
use crate::groupby::{reduce_groups, AggFunction};
use crate::parallel;
use crate::series::arithmetic::ArithmeticOp;
use crate::series::comparison::CmpOp;
use crate::series::{FillNullStrategy, Series};

const LITERAL_NAME: &str = "literal";

fn is_regex_name(name: &str) -> bool {
    name.len() > 1 && name.starts_with('^') && name.ends_with('$')
}

fn regex_names(pattern: &str, df: &DataFrame) -> Result<Vec<String>> {
    let re = Regex::new(pattern)?;
    Ok(df
        .get_column_names()
        .into_iter()
        .filter(|n| re.is_match(n))
        .map(str::to_string)
        .collect())
}

/// Child expressions, in evaluation order
fn children(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Column(_)
        | Expr::Columns(_)
        | Expr::DtypeColumns(_)
        | Expr::Wildcard
        | Expr::Nth(_)
        | Expr::Selector(_)
        | Expr::Literal(_) => vec![],
        Expr::Exclude { expr, .. }
        | Expr::Alias { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::UnaryOp { expr, .. }
        | Expr::Agg { expr, .. }
        | Expr::Sort { expr, .. }
        | Expr::Shift { expr, .. }
        | Expr::Rank { expr, .. }
        | Expr::Rolling { expr, .. }
        | Expr::Apply { expr, .. }
        | Expr::Map { expr, .. } => vec![expr.as_ref()],
        Expr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        Expr::FillNull { expr, fill } => vec![expr.as_ref(), fill.as_ref()],
        Expr::IsIn { expr, other } => vec![expr.as_ref(), other.as_ref()],
        Expr::Case { when_then, else_expr } => when_then
            .iter()
            .flat_map(|(p, t)| [p, t])
            .chain(std::iter::once(else_expr.as_ref()))
            .collect(),
    }
}

/// Column names a multi-column leaf resolves to, `None` for ordinary leaves
fn leaf_names(expr: &Expr, df: &DataFrame) -> Result<Option<Vec<String>>> {
    let names = match expr {
        Expr::Wildcard => df.get_column_names().into_iter().map(str::to_string).collect(),
        Expr::Column(name) if is_regex_name(name) => regex_names(name, df)?,
        Expr::Columns(names) => names.clone(),
        Expr::DtypeColumns(dtypes) => df
            .get_columns()
            .iter()
            .filter(|s| dtypes.contains(s.dtype()))
            .map(|s| s.name().to_string())
            .collect(),
        Expr::Nth(n) => {
            let width = df.width() as i64;
            let idx = if *n < 0 { width + n } else { *n };
            if idx < 0 || idx >= width {
                return Err(Error::IndexOutOfBounds {
                    index: *n,
                    size: df.width(),
                });
            }
            vec![df.get_columns()[idx as usize].name().to_string()]
        }
        Expr::Selector(selector) => selector.select(&df.schema())?,
        _ => return Ok(None),
    };
    Ok(Some(names))
}

/// First multi-column leaf of the tree plus every excluded name
fn find_expansion(
    expr: &Expr,
    df: &DataFrame,
    found: &mut Option<Vec<String>>,
    excluded: &mut Vec<String>,
) -> Result<()> {
    if let Expr::Exclude { names, .. } = expr {
        excluded.extend(names.iter().cloned());
    }
    if found.is_none() {
        if let Some(names) = leaf_names(expr, df)? {
            *found = Some(names);
        }
    }
    for child in children(expr) {
        find_expansion(child, df, found, excluded)?;
    }
    Ok(())
}

/// Replace multi-column leaves by `name` and drop exclusion wrappers
fn substitute(expr: &Expr, name: &str) -> Expr {
    match expr {
        Expr::Wildcard
        | Expr::Columns(_)
        | Expr::DtypeColumns(_)
        | Expr::Nth(_)
        | Expr::Selector(_) => Expr::Column(name.to_string()),
        Expr::Column(n) if is_regex_name(n) => Expr::Column(name.to_string()),
        Expr::Column(_) | Expr::Literal(_) => expr.clone(),
        Expr::Exclude { expr, .. } => substitute(expr, name),
        Expr::Alias { expr, name: alias } => Expr::Alias {
            expr: Box::new(substitute(expr, name)),
            name: alias.clone(),
        },
        Expr::Cast {
            expr,
            data_type,
            strict,
        } => Expr::Cast {
            expr: Box::new(substitute(expr, name)),
            data_type: data_type.clone(),
            strict: *strict,
        },
        Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: Box::new(substitute(left, name)),
            op: *op,
            right: Box::new(substitute(right, name)),
        },
        Expr::UnaryOp { op, expr } => Expr::UnaryOp {
            op: *op,
            expr: Box::new(substitute(expr, name)),
        },
        Expr::Agg { func, expr } => Expr::Agg {
            func: *func,
            expr: Box::new(substitute(expr, name)),
        },
        Expr::Sort { expr, reverse } => Expr::Sort {
            expr: Box::new(substitute(expr, name)),
            reverse: *reverse,
        },
        Expr::Shift { expr, periods } => Expr::Shift {
            expr: Box::new(substitute(expr, name)),
            periods: *periods,
        },
        Expr::FillNull { expr, fill } => Expr::FillNull {
            expr: Box::new(substitute(expr, name)),
            fill: Box::new(substitute(fill, name)),
        },
        Expr::Rank {
            expr,
            method,
            reverse,
        } => Expr::Rank {
            expr: Box::new(substitute(expr, name)),
            method: *method,
            reverse: *reverse,
        },
        Expr::IsIn { expr, other } => Expr::IsIn {
            expr: Box::new(substitute(expr, name)),
            other: Box::new(substitute(other, name)),
        },
        Expr::Rolling {
            expr,
            func,
            options,
        } => Expr::Rolling {
            expr: Box::new(substitute(expr, name)),
            func: *func,
            options: options.clone(),
        },
        Expr::Case {
            when_then,
            else_expr,
        } => Expr::Case {
            when_then: when_then
                .iter()
                .map(|(p, t)| (substitute(p, name), substitute(t, name)))
                .collect(),
            else_expr: Box::new(substitute(else_expr, name)),
        },
        Expr::Apply {
            expr,
            function,
            return_dtype,
            parallel,
        } => Expr::Apply {
            expr: Box::new(substitute(expr, name)),
            function: function.clone(),
            return_dtype: return_dtype.clone(),
            parallel: *parallel,
        },
        Expr::Map { expr, function } => Expr::Map {
            expr: Box::new(substitute(expr, name)),
            function: function.clone(),
        },
    }
}

/// Expand multi-column expressions into one expression per column
pub(crate) fn expand_expr(expr: &Expr, df: &DataFrame) -> Result<Vec<Expr>> {
    let mut found = None;
    let mut excluded = Vec::new();
    find_expansion(expr, df, &mut found, &mut excluded)?;

    let mut excluded_names: HashSet<String> = HashSet::new();
    for name in &excluded {
        if is_regex_name(name) {
            excluded_names.extend(regex_names(name, df)?);
        } else {
            excluded_names.insert(name.clone());
        }
    }

    match found {
        None => Ok(vec![substitute(expr, "")]),
        Some(names) => Ok(names
            .iter()
            .filter(|n| !excluded_names.contains(*n))
            .map(|n| substitute(expr, n))
            .collect()),
    }
}

/// Repeat a unit-length Series `height` times
fn broadcast(s: Series, height: usize) -> Result<Series> {
    if s.len() == height || s.len() != 1 {
        return Ok(s);
    }
    let value = s.get_any(0);
    Series::from_any_values(s.name(), &vec![value; height], false)?.cast(s.dtype())
}

/// Give an all-null operand the dtype of the other side
fn align_nulls(a: Series, b: Series) -> Result<(Series, Series)> {
    let all_null = |s: &Series| !s.is_empty() && s.null_count() == s.len();
    if a.dtype() == b.dtype() {
        Ok((a, b))
    } else if all_null(&a) {
        Ok((a.cast(b.dtype())?, b))
    } else if all_null(&b) {
        let b = b.cast(a.dtype())?;
        Ok((a, b))
    } else {
        Ok((a, b))
    }
}

fn eval_binary(left: &Expr, op: BinaryOperator, right: &Expr, df: &DataFrame) -> Result<Series> {
    let (mut l, mut r) = align_nulls(evaluate(left, df)?, evaluate(right, df)?)?;
    let is_scalar = |e: &Expr| matches!(e, Expr::Literal(LiteralValue::Scalar(_)));
    let left_is_lit = matches!(left, Expr::Literal(_));
    if is_scalar(right) && !left_is_lit {
        r = l.coerce_literal(r)?;
    } else if is_scalar(left) && !matches!(right, Expr::Literal(_)) {
        l = r.coerce_literal(l)?;
    }
    let out = match op {
        BinaryOperator::Add => l.arithmetic(&r, ArithmeticOp::Add)?,
        BinaryOperator::Subtract => l.arithmetic(&r, ArithmeticOp::Sub)?,
        BinaryOperator::Multiply => l.arithmetic(&r, ArithmeticOp::Mul)?,
        BinaryOperator::Divide => l.arithmetic(&r, ArithmeticOp::TrueDiv)?,
        BinaryOperator::FloorDivide => l.arithmetic(&r, ArithmeticOp::FloorDiv)?,
        BinaryOperator::Modulo => l.arithmetic(&r, ArithmeticOp::Rem)?,
        BinaryOperator::Equal => l.compare_op(&r, CmpOp::Eq)?,
        BinaryOperator::NotEqual => l.compare_op(&r, CmpOp::NotEq)?,
        BinaryOperator::LessThan => l.compare_op(&r, CmpOp::Lt)?,
        BinaryOperator::LessThanOrEqual => l.compare_op(&r, CmpOp::LtEq)?,
        BinaryOperator::GreaterThan => l.compare_op(&r, CmpOp::Gt)?,
        BinaryOperator::GreaterThanOrEqual => l.compare_op(&r, CmpOp::GtEq)?,
        BinaryOperator::And => l.and(&r)?,
        BinaryOperator::Or => l.or(&r)?,
        BinaryOperator::Xor => l.xor(&r)?,
    };
    // a literal on the left takes its name from the other side
    if left_is_lit && !matches!(right, Expr::Literal(_)) {
        return Ok(out.with_name(r.name()));
    }
    Ok(out.with_name(l.name()))
}

fn eval_unary(op: UnaryOperator, s: Series) -> Result<Series> {
    match op {
        UnaryOperator::Not => s.not(),
        UnaryOperator::IsNull => Ok(s.is_null()),
        UnaryOperator::IsNotNull => Ok(s.is_not_null()),
        UnaryOperator::IsNan => s.is_nan(),
        UnaryOperator::IsNotNan => s.is_not_nan(),
        UnaryOperator::Abs => s.abs(),
        UnaryOperator::Reverse => Ok(s.reverse()),
        UnaryOperator::Unique => s.unique(),
        UnaryOperator::DropNulls => s.drop_nulls(),
    }
}

fn eval_agg(func: AggExpr, s: Series) -> Result<Series> {
    let reducer = match func {
        AggExpr::Std(ddof) => return Ok(Series::new(s.name(), vec![s.std(ddof)])),
        AggExpr::Var(ddof) => return Ok(Series::new(s.name(), vec![s.var(ddof)])),
        AggExpr::Sum => AggFunction::Sum,
        AggExpr::Mean => AggFunction::Mean,
        AggExpr::Min => AggFunction::Min,
        AggExpr::Max => AggFunction::Max,
        AggExpr::Median => AggFunction::Median,
        AggExpr::Count => AggFunction::Count,
        AggExpr::NUnique => AggFunction::NUnique,
        AggExpr::First => AggFunction::First,
        AggExpr::Last => AggFunction::Last,
    };
    let all_rows: Vec<IdxSize> = (0..s.len() as IdxSize).collect();
    reduce_groups(&s, &[all_rows], reducer, false)
}

fn eval_rolling(func: RollingFunction, s: &Series, options: &crate::series::RollingOptions) -> Result<Series> {
    match func {
        RollingFunction::Min => s.rolling_min(options),
        RollingFunction::Max => s.rolling_max(options),
        RollingFunction::Sum => s.rolling_sum(options),
        RollingFunction::Mean => s.rolling_mean(options),
        RollingFunction::Var => s.rolling_var(options),
        RollingFunction::Std => s.rolling_std(options),
        RollingFunction::Median => s.rolling_median(options),
    }
}

fn eval_case(when_then: &[(Expr, Expr)], else_expr: &Expr, df: &DataFrame) -> Result<Series> {
    let mut branches = Vec::with_capacity(when_then.len());
    let mut height = 1;
    for (predicate, then) in when_then {
        let mask = evaluate(predicate, df)?;
        let value = evaluate(then, df)?;
        height = height.max(mask.len()).max(value.len());
        branches.push((mask, value));
    }
    let otherwise = evaluate(else_expr, df)?;
    height = height.max(otherwise.len());

    let name = branches
        .first()
        .map(|(_, v)| v.name().to_string())
        .unwrap_or_else(|| otherwise.name().to_string());
    let mut out = broadcast(otherwise, height)?;
    // later branches first so earlier predicates take precedence
    for (mask, value) in branches.into_iter().rev() {
        let mask = broadcast(mask, height)?;
        let (value, rest) = align_nulls(broadcast(value, height)?, out)?;
        out = value.zip_with(&mask, &rest)?;
    }
    Ok(out.with_name(&name))
}

/// Evaluate one already expanded expression
pub(crate) fn evaluate(expr: &Expr, df: &DataFrame) -> Result<Series> {
    match expr {
        Expr::Column(name) => df.column(name).cloned(),
        Expr::Wildcard
        | Expr::Columns(_)
        | Expr::DtypeColumns(_)
        | Expr::Nth(_)
        | Expr::Selector(_)
        | Expr::Exclude { .. } => Err(Error::InvalidOperation(format!(
            "multi-column expression {} must be expanded before evaluation",
            expr
        ))),
        Expr::Literal(LiteralValue::Scalar(v)) => {
            Series::from_any_values(LITERAL_NAME, std::slice::from_ref(v), true)
        }
        Expr::Literal(LiteralValue::Series(s)) => Ok(s.clone()),
        Expr::Alias { expr, name } => Ok(evaluate(expr, df)?.with_name(name)),
        Expr::Cast {
            expr,
            data_type,
            strict,
        } => evaluate(expr, df)?.cast_with_options(data_type, *strict),
        Expr::BinaryOp { left, op, right } => eval_binary(left, *op, right, df),
        Expr::UnaryOp { op, expr } => eval_unary(*op, evaluate(expr, df)?),
        Expr::Agg { func, expr } => eval_agg(*func, evaluate(expr, df)?),
        Expr::Sort { expr, reverse } => evaluate(expr, df)?.sort(*reverse),
        Expr::Shift { expr, periods } => evaluate(expr, df)?.shift(*periods),
        Expr::FillNull { expr, fill } => {
            let s = evaluate(expr, df)?;
            let fill = evaluate(fill, df)?;
            if fill.len() == 1 {
                return s.fill_null(FillNullStrategy::Value(fill.get_any(0)));
            }
            let (s, fill) = align_nulls(s, fill)?;
            s.zip_with(&s.is_not_null(), &fill)
        }
        Expr::Rank {
            expr,
            method,
            reverse,
        } => evaluate(expr, df)?.rank(*method, *reverse, None),
        Expr::IsIn { expr, other } => evaluate(expr, df)?.is_in(&evaluate(other, df)?),
        Expr::Rolling {
            expr,
            func,
            options,
        } => eval_rolling(*func, &evaluate(expr, df)?, options),
        Expr::Case {
            when_then,
            else_expr,
        } => eval_case(when_then, else_expr, df),
        Expr::Apply {
            expr,
            function,
            return_dtype,
            parallel,
        } => {
            let f = &function.0;
            evaluate(expr, df)?.apply(|v| f(v), return_dtype.as_ref(), *parallel)
        }
        Expr::Map { expr, function } => evaluate(expr, df)?.map(|s| (function.0)(s)),
    }
}

/// Evaluate `exprs` for a `select`: expand, evaluate, broadcast unit-length
/// results to the context height and reject duplicate output names
pub(crate) fn evaluate_exprs(df: &DataFrame, exprs: &[Expr]) -> Result<Vec<Series>> {
    let mut expanded = Vec::with_capacity(exprs.len());
    for expr in exprs {
        expanded.extend(expand_expr(expr, df)?);
    }
    log::trace!("evaluating {} expressions over {} rows", expanded.len(), df.height());

    let results = parallel::map_slice(&expanded, false, |e| evaluate(e, df))
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let height = if df.width() > 0 {
        df.height()
    } else {
        results.iter().map(Series::len).max().unwrap_or(0)
    };
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(results.len());
    for s in results {
        if !seen.insert(s.name().to_string()) {
            return Err(Error::DuplicateColumnName(s.name().to_string()));
        }
        let s = broadcast(s, height)?;
        if s.len() != height {
            return Err(Error::ShapeMismatch(format!(
                "expression output '{}' has length {}, expected {}",
                s.name(),
                s.len(),
                height
            )));
        }
        out.push(s);
    }
    Ok(out)
}

impl Series {
    /// Evaluate `expr` with this Series as the only column of the context
    pub fn eval(&self, expr: &Expr) -> Result<Series> {
        let df = DataFrame::new(vec![self.clone()])?;
        let mut out = evaluate_exprs(&df, std::slice::from_ref(expr))?;
        match out.len() {
            1 => Ok(out.remove(0)),
            n => Err(Error::InvalidOperation(format!(
                "expression {} produced {} columns, expected one",
                expr, n
            ))),
        }
    }

    /// Fill the length of this Series with a literal
    pub fn full_like(&self, value: AnyValue) -> Result<Series> {
        broadcast(
            Series::from_any_values(self.name(), &[value], false)?,
            self.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dtype::DataType;
    use crate::expr::{all, col, lit, when, Selector};

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("a", vec![Some(1i64), Some(2), None]),
            Series::new("b", vec![1.5f64, 2.5, 3.5]),
            Series::new("c", vec!["x", "y", "z"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_wildcard_with_exclude() {
        let df = frame();
        let out = df.select(&[all().exclude(&["c"])]).unwrap();
        assert_eq!(out.get_column_names(), vec!["a", "b"]);
        let out = df.select(&[col("^[ab]$") * 2]).unwrap();
        assert_eq!(out.get_column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_unit_results_broadcast() {
        let df = frame();
        let out = df.select(&[col("b"), col("b").sum().alias("total")]).unwrap();
        assert_eq!(out.shape(), (3, 2));
        assert_eq!(out.column("total").unwrap().f64().unwrap().non_null_values(), vec![7.5; 3]);
    }

    #[test]
    fn test_duplicate_output_names() {
        let df = frame();
        assert!(df.select(&[col("a"), col("a")]).is_err());
    }

    #[test]
    fn test_null_predicate_takes_otherwise() {
        let df = frame();
        let e = when(col("a").gt(1)).then(lit(10i64)).otherwise(lit(0i64)).alias("flag");
        let out = df.select(&[e]).unwrap();
        assert_eq!(
            out.column("flag").unwrap().i64().unwrap().to_options(),
            vec![Some(0), Some(10), Some(0)]
        );
    }

    #[test]
    fn test_selector_expansion() {
        let df = frame();
        let out = df.select(&[Selector::numeric().into()]).unwrap();
        assert_eq!(out.get_column_names(), vec!["a", "b"]);
        let out = df.select(&[(!Selector::numeric()).into()]).unwrap();
        assert_eq!(out.column("c").unwrap().dtype(), &DataType::Utf8);
    }
}
