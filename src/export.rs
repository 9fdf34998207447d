// src/export.rs
use chrono::Utc;
use csv::Writer;
use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::errors::ExportError;
use crate::models::{ResultTable, Supplier};

/// Column order is part of the output contract; downstream sheets are
/// keyed to it.
pub const COLUMNS: [&str; 6] = [
    "name",
    "website",
    "address",
    "email",
    "phone",
    "certification_evidence",
];

const EMAIL_SEPARATOR: &str = ", ";
const EVIDENCE_SEPARATOR: &str = " | ";
const SHEET_NAME: &str = "Suppliers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "CSV"),
            ExportFormat::Xlsx => write!(f, "Excel (xlsx)"),
        }
    }
}

/// Serializes the table in the fixed column order. Multi-value fields
/// are joined; everything else lands verbatim.
pub fn export(table: &ResultTable, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(table),
        ExportFormat::Xlsx => to_xlsx(table),
    }
}

/// Writes one export file under `dir` with a timestamped name and
/// returns its path.
pub fn write_export(
    table: &ResultTable,
    format: ExportFormat,
    dir: &str,
) -> Result<String, ExportError> {
    std::fs::create_dir_all(dir)?;
    let filename = format!(
        "{}/suppliers_{}.{}",
        dir.trim_end_matches('/'),
        Utc::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    );

    let payload = export(table, format)?;
    std::fs::write(&filename, payload)?;

    info!("Exported {} suppliers to {}", table.len(), filename);
    Ok(filename)
}

fn row(supplier: &Supplier) -> [String; 6] {
    [
        supplier.display_name().to_string(),
        supplier.website.clone(),
        supplier
            .address
            .as_ref()
            .map(|a| a.value.clone())
            .unwrap_or_default(),
        supplier.emails.join(EMAIL_SEPARATOR),
        supplier
            .phone
            .as_ref()
            .map(|p| p.value.clone())
            .unwrap_or_default(),
        supplier.certification_evidence.join(EVIDENCE_SEPARATOR),
    ]
}

fn to_csv(table: &ResultTable) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    {
        let mut writer = Writer::from_writer(&mut buffer);
        writer.write_record(COLUMNS)?;
        for supplier in &table.suppliers {
            writer.write_record(row(supplier))?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

fn to_xlsx(table: &ResultTable) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (row_idx, supplier) in table.suppliers.iter().enumerate() {
        for (col, cell) in row(supplier).into_iter().enumerate() {
            sheet.write_string((row_idx + 1) as u32, col as u16, cell)?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourcedField;

    fn sample_table() -> ResultTable {
        ResultTable {
            suppliers: vec![
                Supplier {
                    website: "acme.com".to_string(),
                    name: Some(SourcedField::heuristic("Acme, Gaskets Ltd")),
                    address: Some(SourcedField::heuristic("Plot 12, MIDC, Pune")),
                    phone: Some(SourcedField::heuristic("+91 20 2712 3456")),
                    emails: vec!["a@acme.com".to_string(), "b@acme.com".to_string()],
                    certification_evidence: vec![
                        "IATF 16949 certified".to_string(),
                        "TS 16949 renewed".to_string(),
                    ],
                    first_rank: 0,
                },
                Supplier {
                    website: "zeta.com".to_string(),
                    name: None,
                    address: None,
                    phone: None,
                    emails: Vec::new(),
                    certification_evidence: Vec::new(),
                    first_rank: 1,
                },
            ],
        }
    }

    #[test]
    fn csv_round_trips_with_fixed_columns() {
        let bytes = export(&sample_table(), ExportFormat::Csv).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers = reader.headers().unwrap().clone();
        let headers: Vec<&str> = headers.iter().collect();
        assert_eq!(headers, COLUMNS.to_vec());

        let records: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);

        // comma inside the name survives quoting
        assert_eq!(&records[0][0], "Acme, Gaskets Ltd");
        assert_eq!(&records[0][3], "a@acme.com, b@acme.com");
        assert_eq!(&records[0][5], "IATF 16949 certified | TS 16949 renewed");

        // absent fields export as blanks, name falls back to the website
        assert_eq!(&records[1][0], "zeta.com");
        assert_eq!(&records[1][2], "");
        assert_eq!(&records[1][4], "");
    }

    #[test]
    fn empty_table_still_writes_the_header() {
        let bytes = export(&ResultTable::default(), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim(), COLUMNS.join(","));
    }

    #[test]
    fn xlsx_export_produces_a_workbook() {
        let bytes = export(&sample_table(), ExportFormat::Xlsx).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }
}
