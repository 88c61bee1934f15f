//! File-format codecs
//!
//! A [`FileCodec`] reads a DataFrame from a byte stream and writes one back.
//! Codecs are looked up by format name in a [`CodecRegistry`]; the default
//! registry carries the CSV and JSON codecs.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;

pub mod csv;
pub mod json;

pub use self::csv::{read_csv, write_csv, CsvCodec};
pub use self::json::{read_json, write_json, JsonCodec};

/// Hints for reading a DataFrame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Stop after this many data rows
    pub n_rows: Option<usize>,
    /// Rows per chunk of the resulting columns
    pub batch_size: usize,
    /// Rows used to infer column dtypes; `None` scans everything
    pub infer_schema_length: Option<usize>,
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            n_rows: None,
            batch_size: 8192,
            infer_schema_length: Some(100),
            has_header: true,
            delimiter: b',',
        }
    }
}

impl ReadOptions {
    pub fn with_n_rows(mut self, n_rows: Option<usize>) -> Self {
        self.n_rows = n_rows;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// A file format that can read and write DataFrames
pub trait FileCodec: Send + Sync {
    /// Format identifier
    fn format_name(&self) -> &'static str;

    /// Supported file extensions
    fn file_extensions(&self) -> Vec<&'static str>;

    /// Read a DataFrame from a stream
    fn read(&self, reader: &mut dyn Read, options: &ReadOptions) -> Result<DataFrame>;

    /// Write a DataFrame to a stream
    fn write(&self, df: &DataFrame, writer: &mut dyn Write) -> Result<()>;

    /// Check if the format can handle the given file
    fn can_handle_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.file_extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn read_path(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame> {
        let mut reader = BufReader::new(File::open(path)?);
        self.read(&mut reader, options)
    }

    fn write_path(&self, df: &DataFrame, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(df, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Codecs keyed by format name
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn FileCodec>>,
}

impl CodecRegistry {
    /// A registry without any codec
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Register a codec under its format name, replacing any previous one
    pub fn register<C: FileCodec + 'static>(&mut self, codec: C) {
        let name = codec.format_name().to_string();
        log::debug!("registering codec '{}'", name);
        self.codecs.insert(name, Arc::new(codec));
    }

    /// Get codec by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn FileCodec>> {
        self.codecs.get(name).cloned().ok_or_else(|| {
            Error::MissingDependency(format!("no codec registered for format '{}'", name))
        })
    }

    /// Codec for a path, chosen by file extension
    pub fn detect(&self, path: &Path) -> Result<Arc<dyn FileCodec>> {
        self.codecs
            .values()
            .find(|c| c.can_handle_file(path))
            .cloned()
            .ok_or_else(|| {
                Error::MissingDependency(format!(
                    "no codec registered for file '{}'",
                    path.display()
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Read `path` with the codec its extension selects
    pub fn read_path(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame> {
        self.detect(path)?.read_path(path, options)
    }

    pub fn write_path(&self, df: &DataFrame, path: &Path) -> Result<()> {
        self.detect(path)?.write_path(df, path)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = CodecRegistry::empty();
        registry.register(CsvCodec);
        registry.register(JsonCodec);
        registry
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_format() {
        let registry = CodecRegistry::default();
        assert!(registry.get("csv").is_ok());
        match registry.get("parquet") {
            Err(Error::MissingDependency(_)) => {}
            other => panic!("expected MissingDependency, got {:?}", other.map(|c| c.format_name())),
        }
        assert!(registry.detect(Path::new("data.ipc")).is_err());
        assert!(registry.detect(Path::new("data.CSV")).is_ok());
    }
}
