// Parsers for the SQLite dump: the fixed-shape product extractor, the line
// classifier/rewriter and a small generic INSERT parser.

pub mod extract;
pub mod insert;
pub mod line;

/// Raw captures of one product INSERT, exactly as written in the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTuple {
    pub name: String,
    pub category_id: String,
    pub proteins: String,
    pub fats: String,
    pub carbohydrates: String,
    pub calories: String,
}

/// What a single dump line is, as far as the normalized conversion cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Part of an old CREATE TABLE block; replaced by the new preamble.
    Schema,
    CategoryInsert,
    ProductInsert,
    Other,
}
