// Normalized conversion: stream the dump line by line into a `categories` +
// `products` schema, injecting `name_normalized` into every product INSERT.

use crate::category::CategoryTable;
use crate::error::{ConvertError, Result};
use crate::logger;
use crate::parser::insert::{parse_insert, unquote};
use crate::parser::line::{classify, LineRewriter};
use crate::parser::LineKind;
use crate::pipeline::{create_output, RunReport};
use crate::progress::ProgressManager;
use indicatif::ProgressBar;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_OUTPUT: &str = "products_supabase.sql";

const PREAMBLE: &str = "\
-- База продуктов для Supabase (PostgreSQL)

CREATE TABLE IF NOT EXISTS categories (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    name_normalized VARCHAR(255) NOT NULL,
    category_id INTEGER NOT NULL,
    protein DECIMAL(6,2),
    fat DECIMAL(6,2),
    carbs DECIMAL(6,2),
    calories DECIMAL(6,2),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

-- Индексы для поиска
CREATE INDEX idx_products_name_normalized ON products(name_normalized);
CREATE INDEX idx_products_category ON products(category_id);

-- Fuzzy search
CREATE EXTENSION IF NOT EXISTS pg_trgm;
CREATE INDEX idx_products_name_trgm ON products USING gin(name_normalized gin_trgm_ops);
CREATE INDEX idx_products_name_search ON products USING gin(to_tsvector('russian', name));

-- Категории
";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedStats {
    pub schema_lines: usize,
    pub category_lines: usize,
    pub product_lines: usize,
    /// Product lines written without the full rewrite (old shape leaks through).
    pub drifted_product_lines: usize,
    pub other_lines: usize,
    pub categories: CategoryTable,
    /// Category ids referenced by products but never defined in the dump.
    pub undefined_category_ids: BTreeSet<i64>,
}

impl NormalizedStats {
    pub fn lines_written(&self) -> usize {
        self.category_lines + self.product_lines
    }

    /// Lines dropped from the output.
    pub fn lines_dropped(&self) -> usize {
        self.schema_lines + self.other_lines
    }
}

pub struct NormalizedConverter {
    rewriter: LineRewriter,
}

impl NormalizedConverter {
    pub fn new() -> Self {
        Self {
            rewriter: LineRewriter::new(),
        }
    }

    pub fn convert<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut out: W,
        input: &Path,
        output: &Path,
        bar: Option<&ProgressBar>,
    ) -> Result<(W, NormalizedStats)> {
        let write_err = |e| ConvertError::io(output, e);
        out.write_all(PREAMBLE.as_bytes()).map_err(write_err)?;

        let mut stats = NormalizedStats::default();
        let mut referenced: BTreeSet<i64> = BTreeSet::new();

        let mut line = String::new();
        while reader
            .read_line(&mut line)
            .map_err(|e| ConvertError::io(input, e))?
            > 0
        {
            if let Some(b) = bar {
                b.inc(line.len() as u64);
            }
            let trimmed = line.trim();

            match classify(trimmed) {
                LineKind::Schema => stats.schema_lines += 1,
                LineKind::CategoryInsert => {
                    record_categories(trimmed, &mut stats.categories);
                    writeln!(out, "{}", trimmed).map_err(write_err)?;
                    stats.category_lines += 1;
                }
                LineKind::ProductInsert => {
                    collect_category_refs(trimmed, &mut referenced);
                    let rewritten = self.rewriter.rewrite_product(trimmed);
                    if !rewritten.is_complete() {
                        logger::debug(&format!(
                            "NormalizedConverter: product line kept in source shape: {}",
                            trimmed
                        ));
                        stats.drifted_product_lines += 1;
                    }
                    writeln!(out, "{}", rewritten.text).map_err(write_err)?;
                    stats.product_lines += 1;
                }
                LineKind::Other => stats.other_lines += 1,
            }

            line.clear();
        }
        out.flush().map_err(write_err)?;

        if let Some(b) = bar {
            b.finish();
        }

        stats.undefined_category_ids = referenced
            .into_iter()
            .filter(|id| !stats.categories.contains(*id))
            .collect();

        logger::debug(&format!(
            "NormalizedConverter: {} schema lines dropped, {} other lines dropped",
            stats.schema_lines, stats.other_lines
        ));
        Ok((out, stats))
    }

    pub fn run(&self, input: &Path, output: &Path, progress: &ProgressManager) -> Result<RunReport> {
        let start = Instant::now();
        logger::debug(&format!("NormalizedConverter: reading {}", input.display()));
        let file = File::open(input).map_err(|e| ConvertError::io(input, e))?;
        let reader = BufReader::new(file);

        // The whole script is built in memory so a read error never
        // truncates an existing output file.
        let bar = progress.new_file_bar(input, "Rewriting");
        let (script, stats) = self.convert(reader, Vec::new(), input, output, bar.as_ref())?;

        let mut out = create_output(output)?;
        out.write_all(&script)
            .and_then(|_| out.flush())
            .map_err(|e| ConvertError::io(output, e))?;

        logger::info(&format!(
            "wrote {} categories and {} products",
            stats.category_lines, stats.product_lines
        ));
        if !stats.undefined_category_ids.is_empty() {
            logger::info(&format!(
                "products reference category ids missing from the dump: {:?}",
                stats.undefined_category_ids
            ));
        }

        let mut report = RunReport::new("fix", input, output);
        report.rows_written = stats.lines_written();
        report.rows_skipped = stats.lines_dropped();
        report.rows_drifted = stats.drifted_product_lines;
        report.categories = stats.categories.len();
        report.elapsed_ms = start.elapsed().as_millis();
        Ok(report)
    }
}

impl Default for NormalizedConverter {
    fn default() -> Self {
        Self::new()
    }
}

// Learn category ids and names from a category INSERT. Rows without an
// explicit id get the next SERIAL value.
fn record_categories(line: &str, categories: &mut CategoryTable) {
    let stmt = match parse_insert(line) {
        Ok(stmt) => stmt,
        Err(e) => {
            logger::debug(&format!("NormalizedConverter: unparsed category line: {}", e));
            return;
        }
    };
    // Without a column list the dump order is (id, name).
    let (id_idx, name_idx) = if stmt.columns.is_empty() {
        (Some(0), Some(1))
    } else {
        (stmt.column_index("id"), stmt.column_index("name"))
    };
    for row in &stmt.rows {
        let id = match id_idx.and_then(|i| row.get(i)) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => id,
                Err(_) => continue,
            },
            None => categories.next_id(),
        };
        if let Some(name) = name_idx.and_then(|i| row.get(i)) {
            categories.insert(id, unquote(name));
        }
    }
}

fn collect_category_refs(line: &str, referenced: &mut BTreeSet<i64>) {
    if let Ok(stmt) = parse_insert(line) {
        referenced.extend(stmt.column_values("category_id").filter_map(|v| v.parse::<i64>().ok()));
    }
}
