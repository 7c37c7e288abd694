// Conversion pipelines. Each one reads a single input file and writes a single
// PostgreSQL script, returning a RunReport for the summary and --report-json.

pub mod json_import;
pub mod normalized;
pub mod nutrition;
pub mod table_import;

use crate::error::{ConvertError, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunReport {
    pub command: String,
    pub input: String,
    pub output: String,
    pub rows_written: usize,
    pub rows_skipped: usize,
    /// Rows written in their source shape because the rewrite did not apply.
    pub rows_drifted: usize,
    pub categories: usize,
    pub elapsed_ms: u128,
}

impl RunReport {
    pub fn new(command: &str, input: &Path, output: &Path) -> Self {
        Self {
            command: command.to_string(),
            input: input.display().to_string(),
            output: output.display().to_string(),
            ..Self::default()
        }
    }
}

pub(crate) fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    Ok(BufWriter::new(file))
}
