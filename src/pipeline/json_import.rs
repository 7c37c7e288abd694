// JSON product list -> `products_nutrition` script, through the same writer
// as the dump conversion.

use crate::error::{ConvertError, Result};
use crate::logger;
use crate::pipeline::{create_output, RunReport};
use crate::progress::ProgressManager;
use crate::sql::normalize_name;
use crate::writer::{NutritionWriter, ProductRecord};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_INPUT: &str = "baza_productov.json";
pub const DEFAULT_OUTPUT: &str = "products_from_json.sql";

/// Category used when an entry has none or an empty one.
pub const DEFAULT_CATEGORY: &str = "Общие";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub calories: f64,
}

impl From<JsonProduct> for ProductRecord {
    fn from(p: JsonProduct) -> Self {
        let name_normalized = normalize_name(p.name.trim());
        Self {
            name_normalized,
            name: p.name,
            category: p
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            protein: p.protein,
            fat: p.fat,
            carbs: p.carbs,
            calories: p.calories.trunc() as i64,
        }
    }
}

pub fn parse_products(text: &str, input: &Path) -> Result<Vec<ProductRecord>> {
    let products: Vec<JsonProduct> =
        serde_json::from_str(text).map_err(|source| ConvertError::Json {
            path: input.to_path_buf(),
            source,
        })?;
    Ok(products.into_iter().map(ProductRecord::from).collect())
}

pub fn run(input: &Path, output: &Path, progress: &ProgressManager) -> Result<RunReport> {
    let start = Instant::now();
    let text = fs::read_to_string(input).map_err(|e| ConvertError::io(input, e))?;
    let records = parse_products(&text, input)?;
    logger::info(&format!("parsed {} products from JSON", records.len()));

    let bar = progress.new_row_bar(records.len() as u64, "Writing products");
    let mut writer = NutritionWriter::new(create_output(output)?);
    writer
        .write_all(&records, bar.as_ref())
        .map_err(|e| ConvertError::io(output, e))?;
    let rows_written = writer.rows_written();
    writer.finish().map_err(|e| ConvertError::io(output, e))?;

    let mut report = RunReport::new("from-json", input, output);
    report.rows_written = rows_written;
    report.categories = records
        .iter()
        .map(|r| r.category.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    report.elapsed_ms = start.elapsed().as_millis();
    Ok(report)
}
