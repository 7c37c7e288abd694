// Denormalized conversion: extract product tuples from the whole dump and
// write them into a single `products_nutrition` table.

use crate::category::CategoryTable;
use crate::error::{ConvertError, Result};
use crate::logger;
use crate::parser::extract::ProductExtractor;
use crate::pipeline::{create_output, RunReport};
use crate::progress::ProgressManager;
use crate::writer::{NutritionWriter, ProductRecord};
use indicatif::ProgressBar;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_OUTPUT: &str = "products_for_supabase.sql";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NutritionStats {
    pub matched: usize,
    pub written: usize,
    /// Product INSERTs present in the dump that did not fit the extractor.
    pub unmatched: usize,
}

pub struct NutritionConverter {
    extractor: ProductExtractor,
    categories: CategoryTable,
}

impl NutritionConverter {
    pub fn new(categories: CategoryTable) -> Self {
        Self {
            extractor: ProductExtractor::new(),
            categories,
        }
    }

    /// Resolve every product in `content`. Fails on the first malformed
    /// numeric so nothing is written for a broken dump.
    pub fn resolve(&self, content: &str) -> Result<Vec<ProductRecord>> {
        self.extractor
            .extract(content)
            .iter()
            .map(|t| ProductRecord::from_tuple(t, &self.categories))
            .collect()
    }

    pub fn convert<W: Write>(
        &self,
        content: &str,
        out: W,
        output: &Path,
        bar: Option<&ProgressBar>,
    ) -> Result<(W, NutritionStats)> {
        let records = self.resolve(content)?;
        self.write_records(content, &records, out, output, bar)
    }

    fn write_records<W: Write>(
        &self,
        content: &str,
        records: &[ProductRecord],
        out: W,
        output: &Path,
        bar: Option<&ProgressBar>,
    ) -> Result<(W, NutritionStats)> {
        logger::info(&format!("found {} products", records.len()));
        if let Some(b) = bar {
            b.set_length(records.len() as u64);
        }

        let mut writer = NutritionWriter::new(out);
        writer
            .write_all(records, bar)
            .map_err(|e| ConvertError::io(output, e))?;
        let written = writer.rows_written();
        let out = writer.finish().map_err(|e| ConvertError::io(output, e))?;

        let seen = content.matches("INSERT INTO products").count();
        let stats = NutritionStats {
            matched: records.len(),
            written,
            unmatched: seen.saturating_sub(records.len()),
        };
        if stats.unmatched > 0 {
            logger::debug(&format!(
                "NutritionConverter: {} product INSERTs did not match the expected shape",
                stats.unmatched
            ));
        }
        Ok((out, stats))
    }

    pub fn run(&self, input: &Path, output: &Path, progress: &ProgressManager) -> Result<RunReport> {
        let start = Instant::now();
        logger::debug(&format!("NutritionConverter: reading {}", input.display()));
        let content = fs::read_to_string(input).map_err(|e| ConvertError::io(input, e))?;

        let records = self.resolve(&content)?;

        let bar = progress.new_row_bar(records.len() as u64, "Writing products");
        let out = create_output(output)?;
        let (_, stats) = self.write_records(&content, &records, out, output, bar.as_ref())?;

        let mut report = RunReport::new("convert", input, output);
        report.rows_written = stats.written;
        report.rows_skipped = stats.unmatched;
        report.categories = self.categories.len();
        report.elapsed_ms = start.elapsed().as_millis();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
CREATE TABLE categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);
INSERT INTO categories (id, name) VALUES (1, 'Хлебобулочные');
INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories) VALUES ('Хлеб', 1, 7.5, 1.2, NULL, 250);
INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories) VALUES ('Пиво', 13, 0.3, NULL, 4.6, 42.8);
INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories) VALUES ('Чипсы', 42, 6.5, 30, 53, 520);
INSERT INTO products (name, category_id) VALUES ('Соль', 8);
";

    fn convert(content: &str) -> (String, NutritionStats) {
        let converter = NutritionConverter::new(CategoryTable::builtin());
        let (out, stats) = converter
            .convert(content, Vec::new(), Path::new("out.sql"), None)
            .unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn insert_count_matches_extracted_rows() {
        let (text, stats) = convert(DUMP);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.written, 3);
        assert_eq!(stats.unmatched, 1);
        let inserts = text
            .lines()
            .filter(|l| l.starts_with("INSERT INTO products_nutrition"))
            .count();
        assert_eq!(inserts, stats.matched);
    }

    #[test]
    fn emits_resolved_values() {
        let (text, _) = convert(DUMP);
        assert!(text.contains("VALUES ('Хлеб', 'хлеб', 'Хлебобулочные', 7.5, 1.2, 0.0, 250);\n"));
        assert!(text.contains("VALUES ('Пиво', 'пиво', 'Алкоголь', 0.3, 0.0, 4.6, 42);\n"));
        assert!(text.contains("VALUES ('Чипсы', 'чипсы', 'Разное', 6.5, 30.0, 53.0, 520);\n"));
        assert!(!text.contains("Соль"));
        assert!(!text.contains("AUTOINCREMENT"));
    }

    #[test]
    fn empty_dump_still_writes_schema() {
        let (text, stats) = convert("");
        assert_eq!(stats, NutritionStats::default());
        assert!(text.contains("CREATE TABLE IF NOT EXISTS products_nutrition ("));
        assert!(!text.contains("INSERT INTO"));
    }

    #[test]
    fn custom_category_table_is_used() {
        let mut categories = CategoryTable::new();
        categories.insert(1, "Bakery");
        let converter = NutritionConverter::new(categories);
        let (out, _) = converter
            .convert(DUMP, Vec::new(), Path::new("out.sql"), None)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("('Хлеб', 'хлеб', 'Bakery',"));
        assert!(text.contains("('Пиво', 'пиво', 'Разное',"));
    }

    #[test]
    fn malformed_number_aborts_before_writing() {
        let dump = "INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories) VALUES ('Сыр', 2, 26, n/a, 0, 360);";
        let converter = NutritionConverter::new(CategoryTable::builtin());
        let err = converter
            .convert(dump, Vec::new(), Path::new("out.sql"), None)
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidNumber { field: "fats", .. }));
    }

    #[test]
    fn run_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("baza.sql");
        let output = dir.path().join(DEFAULT_OUTPUT);
        fs::write(&input, DUMP).unwrap();

        let converter = NutritionConverter::new(CategoryTable::builtin());
        let progress = ProgressManager::new(false);
        let report = converter.run(&input, &output, &progress).unwrap();
        let first = fs::read(&output).unwrap();
        converter.run(&input, &output, &progress).unwrap();
        let second = fs::read(&output).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.command, "convert");
        assert_eq!(report.rows_written, 3);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.categories, 13);
    }

    #[test]
    fn malformed_dump_leaves_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("baza.sql");
        let output = dir.path().join("out.sql");
        fs::write(
            &input,
            "INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories) VALUES ('Сыр', 2, x, 1, 0, 360);",
        )
        .unwrap();
        let converter = NutritionConverter::new(CategoryTable::builtin());
        assert!(converter
            .run(&input, &output, &ProgressManager::new(false))
            .is_err());
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = NutritionConverter::new(CategoryTable::builtin());
        let err = converter
            .run(
                &dir.path().join("baza.sql"),
                &dir.path().join("out.sql"),
                &ProgressManager::new(false),
            )
            .unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
        assert!(!dir.path().join("out.sql").exists());
    }
}
