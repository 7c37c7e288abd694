// Calorie table import: a plain-text table (one product per line, the last
// four columns being protein, fat, carbs and calories) interleaved with
// category heading lines. Rows go through the same writer as the dump
// conversion.

use crate::error::{ConvertError, Result};
use crate::logger;
use crate::pipeline::json_import::DEFAULT_CATEGORY;
use crate::pipeline::{create_output, RunReport};
use crate::progress::ProgressManager;
use crate::sql::{calories_to_int, normalize_name};
use crate::writer::{NutritionWriter, ProductRecord};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_INPUT: &str = "tablica_caloriynosti.md";
pub const DEFAULT_OUTPUT: &str = "products_from_table.sql";

/// Heading lines that switch the category of the rows below them.
pub const CATEGORY_MARKERS: [&str; 17] = [
    "Хлебобулочные изделия, мука, крупы, бобовые",
    "Молочные продукты",
    "Мясные продукты, птица",
    "Колбасные изделия, мясные консервы",
    "Рыба и морепродукты",
    "Рыба соленая, копченая, вяленая, икра",
    "Консервы рыбные",
    "Яйцепродукты",
    "Масла, жиры и жировые продукты",
    "Овощи, картофель, зелень, грибы, овощные консервы",
    "Грибы",
    "Овощные консервы",
    "Фрукты, ягоды, бахчевые",
    "Орехи, семена, сухофрукты",
    "Сахар, сладкое и кондитерские изделия",
    "Соки, напитки безалкогольные",
    "Напитки алкогольные",
];

// Column header fragments. A line holding any of them is not a product.
const HEADER_WORDS: [&str; 5] = ["Продукты", "Белки,", "Жиры,", "Углеводы", "Энергия"];

// Title lines that are neither products nor counted as skipped.
const TITLE_WORDS: [&str; 2] = ["Таблица", "Категории"];

/// Products parsed from a table, plus the number of non-blank lines that
/// were neither a product, a category heading nor a title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableParse {
    pub records: Vec<ProductRecord>,
    pub skipped: usize,
}

pub struct TableParser {
    value_token_re: Regex,
    leading_number_re: Regex,
}

impl TableParser {
    pub fn new() -> Self {
        let value_token_re = Regex::new(r"^[0-9,.\-]+$").expect("valid value token regex");
        let leading_number_re =
            Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
                .expect("valid leading number regex");
        Self {
            value_token_re,
            leading_number_re,
        }
    }

    pub fn parse_table(&self, text: &str) -> TableParse {
        let mut parsed = TableParse::default();
        let mut category = DEFAULT_CATEGORY;

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(marker) = CATEGORY_MARKERS.iter().find(|m| **m == trimmed) {
                logger::debug(&format!("TableParser: category {}", marker));
                category = *marker;
                continue;
            }
            match self.parse_line(trimmed, category) {
                Some(record) => parsed.records.push(record),
                None => {
                    if !trimmed.is_empty() && !TITLE_WORDS.iter().any(|w| trimmed.contains(w)) {
                        logger::debug(&format!("TableParser: skipped line: {}", trimmed));
                        parsed.skipped += 1;
                    }
                }
            }
        }
        parsed
    }

    /// One product row: a name of at least two characters followed by
    /// exactly four numeric columns.
    pub fn parse_line(&self, line: &str, category: &str) -> Option<ProductRecord> {
        let line = line.trim();
        if line.is_empty()
            || HEADER_WORDS.iter().any(|w| line.contains(w))
            || CATEGORY_MARKERS.contains(&line)
        {
            return None;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return None;
        }
        let (name_parts, values) = parts.split_at(parts.len() - 4);
        if !values.iter().all(|v| self.value_token_re.is_match(v)) {
            return None;
        }
        let name = name_parts.join(" ");
        if name.chars().count() < 2 {
            return None;
        }

        let calories_raw = self.parse_value(values[3]);
        let calories = match calories_to_int("calories", (calories_raw + 0.5).floor(), values[3]) {
            Ok(calories) => calories,
            Err(e) => {
                logger::debug(&format!("TableParser: {}", e));
                return None;
            }
        };

        Some(ProductRecord {
            name_normalized: normalize_table_name(&name),
            name,
            category: category.to_string(),
            protein: self.parse_value(values[0]),
            fat: self.parse_value(values[1]),
            carbs: self.parse_value(values[2]),
            calories,
        })
    }

    /// Cell value with a decimal comma. `a-b` ranges are averaged, trace
    /// amounts (`следы`), a lone dash and blanks count as 0.
    pub fn parse_value(&self, raw: &str) -> f64 {
        let raw = raw.trim();
        if raw.contains('-') {
            let mut bounds = raw.split('-');
            let low = bounds.next().and_then(|b| self.leading_number(b));
            let high = bounds.next().and_then(|b| self.leading_number(b));
            if let (Some(low), Some(high)) = (low, high) {
                return (low + high) / 2.0;
            }
        }
        if raw.is_empty() || raw == "-" || raw.to_lowercase().contains("след") {
            return 0.0;
        }
        self.leading_number(raw).unwrap_or(0.0)
    }

    // Longest numeric prefix after swapping the first decimal comma,
    // so `7,5` reads as 7.5 and `12.5.1` as 12.5.
    fn leading_number(&self, raw: &str) -> Option<f64> {
        let text = raw.trim().replacen(',', ".", 1);
        let m = self.leading_number_re.find(&text)?;
        m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Default for TableParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased name with typographic quotes removed and runs of whitespace
/// collapsed to one space.
pub fn normalize_table_name(name: &str) -> String {
    let stripped: String = normalize_name(name)
        .chars()
        .filter(|c| !matches!(*c, '"' | '«' | '»'))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn run(input: &Path, output: &Path, progress: &ProgressManager) -> Result<RunReport> {
    let start = Instant::now();
    logger::debug(&format!("table_import: reading {}", input.display()));
    let text = fs::read_to_string(input).map_err(|e| ConvertError::io(input, e))?;
    let parsed = TableParser::new().parse_table(&text);
    logger::info(&format!(
        "parsed {} products from the table, skipped {} lines",
        parsed.records.len(),
        parsed.skipped
    ));

    let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &parsed.records {
        *per_category.entry(record.category.as_str()).or_default() += 1;
    }
    for (category, count) in &per_category {
        logger::debug(&format!("table_import: {}: {}", category, count));
    }

    let bar = progress.new_row_bar(parsed.records.len() as u64, "Writing products");
    let mut writer = NutritionWriter::new(create_output(output)?);
    writer
        .write_all(&parsed.records, bar.as_ref())
        .map_err(|e| ConvertError::io(output, e))?;
    let rows_written = writer.rows_written();
    writer.finish().map_err(|e| ConvertError::io(output, e))?;

    let mut report = RunReport::new("from-table", input, output);
    report.rows_written = rows_written;
    report.rows_skipped = parsed.skipped;
    report.categories = per_category.len();
    report.elapsed_ms = start.elapsed().as_millis();
    Ok(report)
}
