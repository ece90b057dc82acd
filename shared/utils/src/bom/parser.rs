//! BOM CSV parser

use supplychainx_models::{NewBillOfMaterial, MAX_QUANTITY};
use thiserror::Error;

const MATERIAL_ID: &str = "material_id";
const QUANTITY_PER_UNIT: &str = "quantity_per_unit";
const UNIT: &str = "unit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomRowError {
    /// Line number in the uploaded file, header included.
    pub row_number: u64,
    pub message: String,
}

impl std::fmt::Display for BomRowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.message)
    }
}

#[derive(Debug, Error)]
pub enum BomImportError {
    #[error("BOM file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("BOM file contains no lines")]
    Empty,

    #[error("BOM file has invalid rows: {}", describe_rows(.0))]
    InvalidRows(Vec<BomRowError>),

    #[error("Failed to read BOM file: {0}")]
    Csv(#[from] csv::Error),
}

fn describe_rows(rows: &[BomRowError]) -> String {
    rows.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBomLine {
    pub row_number: u64,
    pub line: NewBillOfMaterial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBom {
    pub lines: Vec<ParsedBomLine>,
}

impl ParsedBom {
    pub fn into_lines(self) -> Vec<NewBillOfMaterial> {
        self.lines.into_iter().map(|l| l.line).collect()
    }
}

/// Column positions resolved from the header row.
struct Columns {
    material_id: usize,
    quantity_per_unit: usize,
    unit: usize,
}

#[derive(Debug, Default)]
pub struct BomParser;

impl BomParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a CSV upload. Header names are case-insensitive and may appear in
    /// any order; blank lines are skipped.
    pub fn parse_csv(&self, data: &[u8]) -> Result<ParsedBom, BomImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let columns = Self::resolve_columns(&headers)?;

        let mut lines = Vec::new();
        let mut errors = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    errors.push(BomRowError {
                        row_number: e.position().map(|p| p.line()).unwrap_or(idx as u64 + 2),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let row_number = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);

            match Self::parse_record(&record, &columns) {
                Ok(line) => lines.push(ParsedBomLine { row_number, line }),
                Err(message) => errors.push(BomRowError { row_number, message }),
            }
        }

        if !errors.is_empty() {
            return Err(BomImportError::InvalidRows(errors));
        }
        if lines.is_empty() {
            return Err(BomImportError::Empty);
        }
        Ok(ParsedBom { lines })
    }

    fn resolve_columns(headers: &[String]) -> Result<Columns, BomImportError> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        match (position(MATERIAL_ID), position(QUANTITY_PER_UNIT), position(UNIT)) {
            (Some(material_id), Some(quantity_per_unit), Some(unit)) => Ok(Columns {
                material_id,
                quantity_per_unit,
                unit,
            }),
            (m, q, u) => {
                let missing = [(m, MATERIAL_ID), (q, QUANTITY_PER_UNIT), (u, UNIT)]
                    .into_iter()
                    .filter(|(found, _)| found.is_none())
                    .map(|(_, name)| name)
                    .collect();
                Err(BomImportError::MissingColumns(missing))
            }
        }
    }

    fn parse_record(record: &csv::StringRecord, columns: &Columns) -> Result<NewBillOfMaterial, String> {
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("missing {}", name))
        };

        let raw_material_id = field(columns.material_id, MATERIAL_ID)?
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| format!("{} must be a positive integer", MATERIAL_ID))?;
        let quantity_per_unit = field(columns.quantity_per_unit, QUANTITY_PER_UNIT)?
            .parse::<i32>()
            .ok()
            .filter(|q| (1..=MAX_QUANTITY).contains(q))
            .ok_or_else(|| format!("{} must be an integer between 1 and {}", QUANTITY_PER_UNIT, MAX_QUANTITY))?;
        let unit = field(columns.unit, UNIT)?;
        if unit.chars().count() > 20 {
            return Err(format!("{} must be at most 20 characters", UNIT));
        }

        Ok(NewBillOfMaterial {
            raw_material_id,
            quantity_per_unit,
            unit: unit.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_csv_parsing() {
        let csv_data = b"material_id,quantity_per_unit,unit\n3,2,kg\n\n7,12,pcs\n";

        let parsed = BomParser::new().parse_csv(csv_data).unwrap();

        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].line.raw_material_id, 3);
        assert_eq!(parsed.lines[1].line.quantity_per_unit, 12);
        assert_eq!(parsed.lines[1].line.unit, "pcs");
    }

    #[test]
    fn test_headers_in_any_order_and_case() {
        let csv_data = b"Unit, Quantity_Per_Unit ,MATERIAL_ID\nm,4,9\n";

        let lines = BomParser::new().parse_csv(csv_data).unwrap().into_lines();
        assert_eq!(lines[0].raw_material_id, 9);
        assert_eq!(lines[0].quantity_per_unit, 4);
        assert_eq!(lines[0].unit, "m");
    }

    #[test]
    fn test_missing_header_column() {
        let err = BomParser::new().parse_csv(b"material_id,unit\n1,kg\n").unwrap_err();
        match err {
            BomImportError::MissingColumns(missing) => assert_eq!(missing, vec!["quantity_per_unit"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_rows_report_line_numbers() {
        let csv_data = b"material_id,quantity_per_unit,unit\n1,2,kg\nabc,2,kg\n4,0,kg\n5,2000000,kg\n";

        let err = BomParser::new().parse_csv(csv_data).unwrap_err();
        match err {
            BomImportError::InvalidRows(rows) => {
                let numbers: Vec<u64> = rows.iter().map(|r| r.row_number).collect();
                assert_eq!(numbers, vec![3, 4, 5]);
                assert!(rows[1].message.contains("quantity_per_unit"));
                assert!(rows[2].message.contains("1000000"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = BomParser::new().parse_csv(b"material_id,quantity_per_unit,unit\n").unwrap_err();
        assert!(matches!(err, BomImportError::Empty));
    }

    proptest! {
        /// Every well-formed row becomes exactly one line.
        #[test]
        fn prop_well_formed_rows_are_all_imported(
            rows in prop::collection::vec((1..10_000i64, 1..1_000i32, "[a-z]{1,5}"), 1..20),
        ) {
            let mut csv = String::from("material_id,quantity_per_unit,unit\n");
            for (id, qty, unit) in &rows {
                csv.push_str(&format!("{},{},{}\n", id, qty, unit));
            }

            let parsed = BomParser::new().parse_csv(csv.as_bytes()).unwrap();
            prop_assert_eq!(parsed.lines.len(), rows.len());
            for (line, (id, qty, _)) in parsed.lines.iter().zip(&rows) {
                prop_assert_eq!(line.line.raw_material_id, *id);
                prop_assert_eq!(line.line.quantity_per_unit, *qty);
            }
        }
    }
}
