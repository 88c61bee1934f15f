use std::io::{Read, Write};
use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::core::any_value::AnyValue;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::io::{FileCodec, ReadOptions};
use crate::series::Series;

/// JSON documents backed by `serde_json`.
///
/// Reading accepts an array of records (`[{"a": 1}, ...]`) or a
/// column-oriented object (`{"a": [1, 2]}`). Writing always produces records.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

/// Read a DataFrame from a JSON file
pub fn read_json<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<DataFrame> {
    JsonCodec.read_path(path.as_ref(), options)
}

/// Write a DataFrame to a JSON file
pub fn write_json<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    JsonCodec.write_path(df, path.as_ref())
}

fn json_to_any(value: &Value) -> Result<AnyValue> {
    Ok(match value {
        Value::Null => AnyValue::Null,
        Value::Bool(b) => AnyValue::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => AnyValue::Int64(i),
            (None, Some(u), _) => AnyValue::UInt64(u),
            (None, None, Some(f)) => AnyValue::Float64(f),
            _ => return Err(Error::InvalidValue(format!("unrepresentable number {}", n))),
        },
        Value::String(s) => AnyValue::Utf8(s.clone()),
        Value::Array(items) => {
            let values = items.iter().map(json_to_any).collect::<Result<Vec<_>>>()?;
            AnyValue::List(Series::from_any_values("", &values, false)?)
        }
        Value::Object(map) => AnyValue::Struct(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), json_to_any(v)?)))
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

fn any_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        // NaN and infinities have no JSON form
        AnyValue::Float32(v) => Number::from_f64(v as f64).map_or(Value::Null, Value::Number),
        AnyValue::Float64(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        AnyValue::Utf8(s) => Value::String(s),
        AnyValue::List(s) => Value::Array(s.iter().map(any_to_json).collect()),
        AnyValue::Struct(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, any_to_json(v)))
                .collect(),
        ),
        other => Value::String(other.to_string()),
    }
}

fn read_records(items: Vec<Value>, limit: usize) -> Result<DataFrame> {
    let records = items
        .iter()
        .take(limit)
        .map(|item| match item {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_to_any(v)?)))
                .collect::<Result<Vec<_>>>(),
            _ => Err(Error::InvalidValue(
                "each element of a JSON array must be an object".to_string(),
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    DataFrame::from_records(&records, None, false)
}

fn read_columns(map: Map<String, Value>, limit: usize) -> Result<DataFrame> {
    let columns = map
        .into_iter()
        .map(|(name, column)| match column {
            Value::Array(items) => {
                let values = items
                    .iter()
                    .take(limit)
                    .map(json_to_any)
                    .collect::<Result<Vec<_>>>()?;
                Series::from_any_values(&name, &values, false)
            }
            _ => Err(Error::InvalidValue(format!(
                "JSON column '{}' must be an array",
                name
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    DataFrame::new(columns)
}

impl FileCodec for JsonCodec {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn file_extensions(&self) -> Vec<&'static str> {
        vec!["json"]
    }

    fn read(&self, reader: &mut dyn Read, options: &ReadOptions) -> Result<DataFrame> {
        let value: Value = serde_json::from_reader(reader)?;
        let limit = options.n_rows.unwrap_or(usize::MAX);
        let mut df = match value {
            Value::Array(items) => read_records(items, limit)?,
            Value::Object(map) => read_columns(map, limit)?,
            _ => {
                return Err(Error::InvalidValue(
                    "JSON must be an object or an array".to_string(),
                ))
            }
        };
        df.rechunk();
        Ok(df)
    }

    fn write(&self, df: &DataFrame, writer: &mut dyn Write) -> Result<()> {
        let names = df.get_column_names();
        let records: Vec<Value> = (0..df.height())
            .map(|row| {
                let record: Map<String, Value> = names
                    .iter()
                    .zip(df.get_columns())
                    .map(|(name, s)| (name.to_string(), any_to_json(s.get_any(row))))
                    .collect();
                Value::Object(record)
            })
            .collect();
        serde_json::to_writer(writer, &Value::Array(records))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dtype::DataType;

    #[test]
    fn test_records_with_missing_keys() {
        let data = r#"[{"a": 1, "b": "x"}, {"a": 2}, {"b": "z", "a": null}]"#;
        let df = JsonCodec.read(&mut data.as_bytes(), &ReadOptions::default()).unwrap();
        assert_eq!(df.get_column_names(), vec!["a", "b"]);
        assert_eq!(df.dtypes(), vec![DataType::Int64, DataType::Utf8]);
        assert_eq!(df.column("a").unwrap().null_count(), 1);
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_column_oriented_with_row_limit() {
        let data = r#"{"x": [1.5, 2.5, 3.5], "flag": [true, false, true]}"#;
        let options = ReadOptions::default().with_n_rows(Some(2));
        let df = JsonCodec.read(&mut data.as_bytes(), &options).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_write_then_read_records() {
        let df = DataFrame::new(vec![
            Series::new("id", vec![1i64, 2]),
            Series::new("name", vec![Some("ann"), None]),
        ])
        .unwrap();
        let mut buf = Vec::new();
        JsonCodec.write(&df, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            r#"[{"id":1,"name":"ann"},{"id":2,"name":null}]"#
        );
        let back = JsonCodec.read(&mut buf.as_slice(), &ReadOptions::default()).unwrap();
        assert_eq!(back, df);
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        let result = JsonCodec.read(&mut "42".as_bytes(), &ReadOptions::default());
        assert!(matches!(result, Err(Error::InvalidValue(_))));
    }
}
