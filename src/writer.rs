// Writer for the denormalized `products_nutrition` table: DDL, search
// indexes and one INSERT per product.

use crate::category::CategoryTable;
use crate::error::Result;
use crate::parser::ProductTuple;
use crate::sql::{format_decimal, normalize_name, parse_calories, parse_decimal, quote};
use indicatif::ProgressBar;
use std::io::{self, Write};

const PREAMBLE: &str = "\
-- Миграция: Добавление продуктов в базу данных
-- Таблица products_nutrition для Supabase (PostgreSQL)

CREATE TABLE IF NOT EXISTS products_nutrition (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    name_normalized VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    protein DECIMAL(6,2) NOT NULL,
    fat DECIMAL(6,2) NOT NULL,
    carbs DECIMAL(6,2) NOT NULL,
    calories INTEGER NOT NULL,
    per_grams INTEGER DEFAULT 100,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

-- Индексы для быстрого поиска
CREATE INDEX IF NOT EXISTS idx_products_name_normalized ON products_nutrition(name_normalized);
CREATE INDEX IF NOT EXISTS idx_products_category ON products_nutrition(category);

-- Fuzzy search
CREATE EXTENSION IF NOT EXISTS pg_trgm;
CREATE INDEX IF NOT EXISTS idx_products_name_trgm ON products_nutrition USING gin(name_normalized gin_trgm_ops);
CREATE INDEX IF NOT EXISTS idx_products_name_search ON products_nutrition USING gin(to_tsvector('russian', name));

-- Вставка продуктов
";

const INSERT_PREFIX: &str = "INSERT INTO products_nutrition (name, name_normalized, category, protein, fat, carbs, calories) VALUES ";

/// One fully resolved row of `products_nutrition`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub name_normalized: String,
    pub category: String,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub calories: i64,
}

impl ProductRecord {
    /// Resolve a raw dump tuple: category id through `categories`, `NULL`
    /// numerics to zero, calories truncated to an integer.
    pub fn from_tuple(tuple: &ProductTuple, categories: &CategoryTable) -> Result<Self> {
        // Ids too large for i64 cannot be in the table either.
        let category = match tuple.category_id.parse::<i64>() {
            Ok(id) => categories.resolve(id),
            Err(_) => crate::category::FALLBACK_CATEGORY,
        };
        Ok(Self {
            name: tuple.name.clone(),
            name_normalized: normalize_name(&tuple.name),
            category: category.to_string(),
            protein: parse_decimal("proteins", &tuple.proteins)?,
            fat: parse_decimal("fats", &tuple.fats)?,
            carbs: parse_decimal("carbohydrates", &tuple.carbohydrates)?,
            calories: parse_calories("calories", &tuple.calories)?,
        })
    }

    pub fn insert_statement(&self) -> String {
        format!(
            "{}({}, {}, {}, {}, {}, {}, {});",
            INSERT_PREFIX,
            quote(&self.name),
            quote(&self.name_normalized),
            quote(&self.category),
            format_decimal(self.protein),
            format_decimal(self.fat),
            format_decimal(self.carbs),
            self.calories
        )
    }
}

pub struct NutritionWriter<W: Write> {
    out: W,
    rows_written: usize,
}

impl<W: Write> NutritionWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows_written: 0,
        }
    }

    pub fn write_preamble(&mut self) -> io::Result<()> {
        self.out.write_all(PREAMBLE.as_bytes())
    }

    pub fn write_record(&mut self, record: &ProductRecord) -> io::Result<()> {
        writeln!(self.out, "{}", record.insert_statement())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Preamble followed by every record.
    pub fn write_all(
        &mut self,
        records: &[ProductRecord],
        bar: Option<&ProgressBar>,
    ) -> io::Result<()> {
        self.write_preamble()?;
        for record in records {
            self.write_record(record)?;
            if let Some(b) = bar {
                b.inc(1);
            }
        }
        if let Some(b) = bar {
            b.finish();
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
