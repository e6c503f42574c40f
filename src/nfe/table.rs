//! Read NFe files and collect their records into one table.

use std::fs;
use std::iter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use itertools::Itertools;
use roxmltree::{Document, ParsingOptions};

use crate::date::format_date;
use crate::nfe::normalize::{Field, Record, normalize};

/// Installment records with a fixed column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTable {
    columns: Vec<Field>,
    rows: Vec<Record>,
}

impl OutputTable {
    /// Build the final table from raw records.
    ///
    /// Issue and due dates are reformatted to `dd/mm/yyyy`.
    /// Columns keep their first-seen order, with the complementary info column moved last.
    #[must_use]
    pub fn from_records(mut records: Vec<Record>) -> Self {
        for record in &mut records {
            for field in Field::CANONICAL_ORDER.into_iter().filter(|field| field.is_date()) {
                record.update(field, |value| format_date(value.as_deref()));
            }
        }
        let columns = order_columns(&records);
        Self { columns, rows: records }
    }

    #[must_use]
    pub fn columns(&self) -> &[Field] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at the given row and column, `None` for absent values and fields the record lacks.
    #[must_use]
    pub fn cell(&self, row: usize, field: Field) -> Option<&str> {
        self.rows.get(row).and_then(|record| record.get(field))
    }

    /// Iterate rows as cell values in column order.
    pub fn iter_rows(&self) -> impl Iterator<Item = Vec<Option<&str>>> + '_ {
        self.rows
            .iter()
            .map(|record| self.columns.iter().map(|&field| record.get(field)).collect())
    }
}

/// Column order for a set of records.
///
/// Fields appear in the order they are first seen across all records, except the
/// complementary info which always comes last. Without records the canonical order is used.
#[must_use]
pub fn order_columns(records: &[Record]) -> Vec<Field> {
    if records.is_empty() {
        return Field::CANONICAL_ORDER.to_vec();
    }
    records
        .iter()
        .flat_map(Record::fields)
        .unique()
        .filter(|&field| field != Field::ComplementaryInfo)
        .chain(iter::once(Field::ComplementaryInfo))
        .collect()
}

/// Parse XML text and flatten it to records.
///
/// # Errors
/// Returns an error if the text is not well-formed XML or the root element has no namespace.
pub fn parse_document(xml: &str) -> Result<Vec<Record>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options).context("Invalid XML")?;
    normalize(&document)
}

/// Read, decode and flatten one NFe file.
///
/// # Errors
/// Returns an error naming the file if it cannot be read or is not a valid NFe document.
pub fn parse_file(path: &Path) -> Result<Vec<Record>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let text = decode_xml(&bytes, path);
    parse_document(&text).with_context(|| format!("Malformed NFe document: {}", path.display()))
}

/// Parse all files in order and build the output table.
///
/// # Errors
/// Fails on the first file that cannot be read or parsed.
pub fn assemble(paths: &[PathBuf]) -> Result<OutputTable> {
    assemble_with_progress(paths, |_, _| {})
}

/// Same as [`assemble`], calling `on_document` with the records of each file as it is parsed.
///
/// # Errors
/// Fails on the first file that cannot be read or parsed.
pub fn assemble_with_progress<F>(paths: &[PathBuf], mut on_document: F) -> Result<OutputTable>
where
    F: FnMut(&Path, &[Record]),
{
    let mut records: Vec<Record> = Vec::new();
    for path in paths {
        let document_records = parse_file(path)?;
        on_document(path, &document_records);
        records.extend(document_records);
    }
    Ok(OutputTable::from_records(records))
}

/// Decode file contents using the encoding from the XML declaration, UTF-8 if none is given.
fn decode_xml(bytes: &[u8], path: &Path) -> String {
    let header = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).to_lowercase();
    let encoding = declared_encoding(&header)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        crate::print_warning(&format!(
            "Decoding errors in {} using {}",
            path.display(),
            encoding.name()
        ));
    }
    text.into_owned()
}

/// Encoding label from an XML declaration such as `<?xml version="1.0" encoding = 'ISO-8859-1'?>`.
fn declared_encoding(header: &str) -> Option<&str> {
    let declaration = header
        .strip_prefix('\u{feff}')
        .unwrap_or(header)
        .trim_start()
        .strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let rest = declaration[declaration.find("encoding")? + "encoding".len()..]
        .trim_start()
        .strip_prefix('=')?
        .trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    rest.find(quote).map(|end| &rest[..end])
}
