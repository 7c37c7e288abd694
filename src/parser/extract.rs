// Product extractor for the denormalized conversion.
// Matches one fixed statement shape; anything else is silently skipped.

use crate::logger;
use crate::parser::ProductTuple;
use regex::Regex;

const PRODUCT_INSERT_PATTERN: &str = r"INSERT INTO products \(name, category_id, proteins, fats, carbohydrates, calories\) VALUES \('([^']+)', (\d+), ([^,\)]+), ([^,\)]+), ([^,\)]+), ([^)]+)\);";

pub struct ProductExtractor {
    insert_re: Regex,
}

impl ProductExtractor {
    pub fn new() -> Self {
        let insert_re = Regex::new(PRODUCT_INSERT_PATTERN).expect("valid product insert regex");
        Self { insert_re }
    }

    /// All product tuples in `content`, in source order.
    pub fn extract(&self, content: &str) -> Vec<ProductTuple> {
        let tuples: Vec<ProductTuple> = self
            .insert_re
            .captures_iter(content)
            .map(|cap| ProductTuple {
                name: cap[1].to_string(),
                category_id: cap[2].to_string(),
                proteins: cap[3].to_string(),
                fats: cap[4].to_string(),
                carbohydrates: cap[5].to_string(),
                calories: cap[6].to_string(),
            })
            .collect();
        logger::debug(&format!("ProductExtractor: {} matches", tuples.len()));
        tuples
    }
}

impl Default for ProductExtractor {
    fn default() -> Self {
        Self::new()
    }
}
