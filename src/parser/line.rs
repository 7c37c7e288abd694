// Line classification and product INSERT rewriting for the normalized schema.

use crate::parser::LineKind;
use crate::sql::{escape_literal, normalize_name};
use regex::Regex;

pub const SOURCE_PRODUCT_INSERT: &str =
    "INSERT INTO products (name, category_id, proteins, fats, carbohydrates, calories)";
pub const TARGET_PRODUCT_INSERT: &str =
    "INSERT INTO products (name, name_normalized, category_id, protein, fat, carbs, calories)";

/// Classify a trimmed dump line.
pub fn classify(line: &str) -> LineKind {
    if line.starts_with("CREATE TABLE")
        || line.contains("AUTOINCREMENT")
        || line.contains("FOREIGN KEY")
        || line == ");"
    {
        LineKind::Schema
    } else if line.starts_with("INSERT INTO categories") {
        LineKind::CategoryInsert
    } else if line.starts_with("INSERT INTO products") {
        LineKind::ProductInsert
    } else {
        LineKind::Other
    }
}

pub struct LineRewriter {
    values_name_re: Regex,
}

/// Result of rewriting one product INSERT line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenLine {
    pub text: String,
    pub columns_rewritten: bool,
    pub name_spliced: bool,
}

impl RewrittenLine {
    pub fn is_complete(&self) -> bool {
        self.columns_rewritten && self.name_spliced
    }
}

impl LineRewriter {
    pub fn new() -> Self {
        let values_name_re = Regex::new(r"VALUES \('([^']+)',").expect("valid VALUES name regex");
        Self { values_name_re }
    }

    /// Swap the column list and splice `name_normalized` after the first
    /// name literal. Lines of another shape come back with whatever part
    /// of the rewrite applied.
    pub fn rewrite_product(&self, line: &str) -> RewrittenLine {
        let columns_rewritten = line.contains(SOURCE_PRODUCT_INSERT);
        let mut text = line.replace(SOURCE_PRODUCT_INSERT, TARGET_PRODUCT_INSERT);

        let splice = self.values_name_re.captures(&text).map(|cap| {
            let at = cap.get(0).map_or(0, |m| m.end());
            (at, escape_literal(&normalize_name(&cap[1])))
        });
        let name_spliced = splice.is_some();
        if let Some((at, normalized)) = splice {
            text.insert_str(at, &format!(" '{}',", normalized));
        }

        RewrittenLine {
            text,
            columns_rewritten,
            name_spliced,
        }
    }
}

impl Default for LineRewriter {
    fn default() -> Self {
        Self::new()
    }
}
