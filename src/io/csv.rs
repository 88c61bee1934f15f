use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::core::any_value::AnyValue;
use crate::core::dtype::DataType;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::io::{FileCodec, ReadOptions};
use crate::series::Series;

/// Comma-separated values backed by the `csv` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

/// Read a DataFrame from a CSV file
pub fn read_csv<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<DataFrame> {
    CsvCodec.read_path(path.as_ref(), options)
}

/// Write a DataFrame to a CSV file
pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    CsvCodec.write_path(df, path.as_ref())
}

/// Narrowest dtype every sampled field parses as
fn infer_dtype(fields: &[Option<String>]) -> DataType {
    let present: Vec<&str> = fields.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        return DataType::Utf8;
    }
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        DataType::Int64
    } else if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        DataType::Float64
    } else if present.iter().all(|v| parse_bool(v).is_some()) {
        DataType::Boolean
    } else {
        DataType::Utf8
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    if v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse one field as `dtype`; `None` when it does not fit
fn parse_field(field: &Option<String>, dtype: &DataType) -> Option<AnyValue> {
    let Some(v) = field else {
        return Some(AnyValue::Null);
    };
    match dtype {
        DataType::Int64 => v.parse::<i64>().ok().map(AnyValue::Int64),
        DataType::Float64 => v.parse::<f64>().ok().map(AnyValue::Float64),
        DataType::Boolean => parse_bool(v).map(AnyValue::Boolean),
        _ => Some(AnyValue::Utf8(v.clone())),
    }
}

/// Column values of one batch; a field outside the inferred dtype demotes the
/// column to Utf8 from then on
fn build_chunk(name: &str, fields: &[Option<String>], dtype: &mut DataType) -> Result<Series> {
    let parsed: Option<Vec<AnyValue>> = fields.iter().map(|f| parse_field(f, dtype)).collect();
    let values = match parsed {
        Some(values) => values,
        None => {
            log::debug!("column '{}' does not fit {}, reading it as Utf8", name, dtype);
            *dtype = DataType::Utf8;
            fields
                .iter()
                .map(|f| f.clone().map(AnyValue::Utf8).unwrap_or(AnyValue::Null))
                .collect()
        }
    };
    Series::from_any_values_and_dtype(name, &values, dtype, true)
}

struct ColumnBuilder {
    name: String,
    dtype: Option<DataType>,
    pending: Vec<Option<String>>,
    chunks: Vec<Series>,
}

impl ColumnBuilder {
    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut dtype = match self.dtype.take() {
            Some(dtype) => dtype,
            None => infer_dtype(&self.pending),
        };
        let chunk = build_chunk(&self.name, &self.pending, &mut dtype)?;
        self.pending.clear();
        self.chunks.push(chunk);
        self.dtype = Some(dtype);
        Ok(())
    }

    fn finish(mut self) -> Result<Series> {
        self.flush()?;
        let dtype = self.dtype.clone().unwrap_or(DataType::Utf8);
        let mut chunks = self.chunks.into_iter();
        let mut out = match chunks.next() {
            Some(chunk) => chunk.cast(&dtype)?,
            None => return Ok(Series::new_empty(&self.name, Some(&dtype))),
        };
        for chunk in chunks {
            // a late demotion to Utf8 leaves earlier chunks typed
            out.append(&chunk.cast(&dtype)?)?;
        }
        Ok(out)
    }
}

fn record_fields(record: &StringRecord, width: usize) -> Result<Vec<Option<String>>> {
    if record.len() != width {
        return Err(Error::ShapeMismatch(format!(
            "CSV record has {} fields, expected {}",
            record.len(),
            width
        )));
    }
    Ok(record
        .iter()
        .map(|f| if f.is_empty() { None } else { Some(f.to_string()) })
        .collect())
}

impl FileCodec for CsvCodec {
    fn format_name(&self) -> &'static str {
        "csv"
    }

    fn file_extensions(&self) -> Vec<&'static str> {
        vec!["csv"]
    }

    fn read(&self, reader: &mut dyn Read, options: &ReadOptions) -> Result<DataFrame> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(options.has_header)
            .delimiter(options.delimiter)
            .from_reader(reader);

        let header = if options.has_header {
            Some(rdr.headers()?.clone())
        } else {
            None
        };
        let mut records = rdr.records();
        let mut first: Option<StringRecord> = None;
        let names: Vec<String> = match header {
            Some(header) => header.iter().map(str::to_string).collect(),
            None => match records.next() {
                Some(record) => {
                    let record = record?;
                    let names = (0..record.len()).map(|i| format!("column_{}", i)).collect();
                    first = Some(record);
                    names
                }
                None => return Ok(DataFrame::empty()),
            },
        };

        let width = names.len();
        let mut builders: Vec<ColumnBuilder> = names
            .into_iter()
            .map(|name| ColumnBuilder {
                name,
                dtype: None,
                pending: Vec::new(),
                chunks: Vec::new(),
            })
            .collect();

        // the first flush infers dtypes, so it covers the inference window
        let first_batch = match options.infer_schema_length {
            Some(n) => n.max(1),
            None => usize::MAX,
        };
        let batch_size = options.batch_size.max(1);
        let limit = options.n_rows.unwrap_or(usize::MAX);

        let mut rows = 0usize;
        let mut in_batch = 0usize;
        let mut inferred = false;
        let mut next = first.map(Ok);
        loop {
            if rows >= limit {
                break;
            }
            let record = match next.take().or_else(|| records.next()) {
                Some(record) => record?,
                None => break,
            };
            for (builder, field) in builders.iter_mut().zip(record_fields(&record, width)?) {
                builder.pending.push(field);
            }
            rows += 1;
            in_batch += 1;
            let target = if inferred { batch_size } else { first_batch.max(batch_size) };
            if in_batch >= target {
                for builder in builders.iter_mut() {
                    builder.flush()?;
                }
                in_batch = 0;
                inferred = true;
            }
        }
        log::debug!("read {} CSV rows into {} columns", rows, width);

        let columns = builders
            .into_iter()
            .map(ColumnBuilder::finish)
            .collect::<Result<Vec<_>>>()?;
        DataFrame::new(columns)
    }

    fn write(&self, df: &DataFrame, writer: &mut dyn Write) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(df.get_column_names())?;
        for row in 0..df.height() {
            let record: Vec<String> = df
                .get_columns()
                .iter()
                .map(|s| match s.get_any(row) {
                    AnyValue::Null => String::new(),
                    v => v.to_string(),
                })
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_infers_dtypes() {
        let data = "id,score,name,flag\n1,2.5,ann,true\n2,,bob,false\n3,4.0,,true\n";
        let df = CsvCodec.read(&mut data.as_bytes(), &ReadOptions::default()).unwrap();
        assert_eq!(df.shape(), (3, 4));
        assert_eq!(
            df.dtypes(),
            vec![DataType::Int64, DataType::Float64, DataType::Utf8, DataType::Boolean]
        );
        assert_eq!(df.column("score").unwrap().null_count(), 1);
    }

    #[test]
    fn test_n_rows_and_batches() {
        let data = "x\n1\n2\n3\n4\n5\n";
        let options = ReadOptions::default()
            .with_n_rows(Some(4))
            .with_batch_size(2)
            .with_infer_schema_length(Some(1));
        let df = CsvCodec.read(&mut data.as_bytes(), &options).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.column("x").unwrap().chunk_lengths(), vec![2, 2]);
    }

    #[test]
    fn test_late_value_demotes_to_utf8() {
        let data = "x\n1\n2\nthree\n";
        let options = ReadOptions::default()
            .with_batch_size(1)
            .with_infer_schema_length(Some(1));
        let df = CsvCodec.read(&mut data.as_bytes(), &options).unwrap();
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Utf8);
        assert_eq!(df.height(), 3);
    }
}
