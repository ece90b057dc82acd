//! Bill-of-materials CSV import.
//!
//! Parses `material_id,quantity_per_unit,unit` files into BOM lines ready to
//! attach to a product. A file with any malformed row is rejected as a whole.

pub mod parser;

pub use parser::{BomImportError, BomParser, BomRowError, ParsedBom, ParsedBomLine};
