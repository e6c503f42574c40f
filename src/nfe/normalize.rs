//! Flatten one NFe document into installment records.

use std::fmt;

use anyhow::Result;
use roxmltree::Document;

use crate::nfe::extract::{Namespace, get_all, get_first};

/// Output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    InvoiceNumber,
    InvoiceKey,
    CompanyName,
    IssueDate,
    ComplementaryInfo,
    Installment,
    InstallmentValue,
    DueDate,
}

impl Field {
    /// Invoice-level fields in the order they are added to a record.
    pub const COMMON: [Self; 5] = [
        Self::InvoiceNumber,
        Self::InvoiceKey,
        Self::CompanyName,
        Self::IssueDate,
        Self::ComplementaryInfo,
    ];

    /// Columns in the order of a finished table.
    pub const CANONICAL_ORDER: [Self; 8] = [
        Self::InvoiceNumber,
        Self::InvoiceKey,
        Self::CompanyName,
        Self::IssueDate,
        Self::Installment,
        Self::InstallmentValue,
        Self::DueDate,
        Self::ComplementaryInfo,
    ];

    /// Column header used in the exported sheet.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InvoiceNumber => "Numero da NFe",
            Self::InvoiceKey => "Chave NFe",
            Self::CompanyName => "Nome empresa",
            Self::IssueDate => "Data de emissao",
            Self::ComplementaryInfo => "Informacoes complementares",
            Self::Installment => "Fatura",
            Self::InstallmentValue => "Valor fatura",
            Self::DueDate => "Data de Vencimento",
        }
    }

    /// Local XML tag name the value is read from.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::InvoiceNumber => "nNF",
            Self::InvoiceKey => "chNFe",
            Self::CompanyName => "xNome",
            Self::IssueDate => "dhEmi",
            Self::ComplementaryInfo => "infCpl",
            Self::Installment => "nDup",
            Self::InstallmentValue => "vDup",
            Self::DueDate => "dVenc",
        }
    }

    /// Columns that hold dates and get reformatted after assembly.
    #[must_use]
    pub const fn is_date(self) -> bool {
        matches!(self, Self::IssueDate | Self::DueDate)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Invoice-level values shared by every installment row of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonFields {
    values: Vec<(Field, Option<String>)>,
}

impl CommonFields {
    /// Read the common fields from a document.
    #[must_use]
    pub fn extract(document: &Document, namespace: &Namespace) -> Self {
        let values = Field::COMMON
            .iter()
            .map(|&field| (field, get_first(document, namespace, field.tag())))
            .collect();
        Self { values }
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == field)
            .and_then(|(_, value)| value.as_deref())
    }
}

/// One installment, aligned by position across the `nDup`, `vDup` and `dVenc` lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentTriple {
    pub label: String,
    pub value: Option<String>,
    pub due_date: Option<String>,
}

/// Pair the three installment lists by position.
///
/// The labels list decides the count: a shorter values or due dates list leaves the trailing
/// installments without that field, and extra values or due dates beyond the labels are dropped.
#[must_use]
pub fn align_installments(labels: Vec<String>, values: &[String], due_dates: &[String]) -> Vec<InstallmentTriple> {
    labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| InstallmentTriple {
            label,
            value: values.get(index).cloned(),
            due_date: due_dates.get(index).cloned(),
        })
        .collect()
}

/// One output row: field values in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(Field, Option<String>)>,
}

impl Record {
    /// Combine common fields with one installment.
    #[must_use]
    pub fn new(common: &CommonFields, installment: InstallmentTriple) -> Self {
        let mut record = Self {
            fields: common.values.clone(),
        };
        record.set(Field::Installment, Some(installment.label));
        record.set(Field::InstallmentValue, installment.value);
        record.set(Field::DueDate, installment.due_date);
        record
    }

    /// Value of a field, `None` if the field is missing or absent.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == field)
            .and_then(|(_, value)| value.as_deref())
    }

    /// True if the record has a column for this field, even an absent one.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.fields.iter().any(|(key, _)| *key == field)
    }

    /// Replace the value of an existing field or append a new one.
    pub fn set(&mut self, field: Field, value: Option<String>) {
        if let Some(entry) = self.fields.iter_mut().find(|(key, _)| *key == field) {
            entry.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Apply a function to the value of a field if it is present.
    pub fn update(&mut self, field: Field, update: impl FnOnce(Option<String>) -> Option<String>) {
        if let Some(entry) = self.fields.iter_mut().find(|(key, _)| *key == field) {
            entry.1 = update(entry.1.take());
        }
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().map(|(field, _)| *field)
    }
}

impl FromIterator<(Field, Option<String>)> for Record {
    fn from_iter<I: IntoIterator<Item = (Field, Option<String>)>>(iter: I) -> Self {
        let mut record = Self::default();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = self
            .fields
            .iter()
            .map(|(field, value)| format!("{}: {}", field.label(), value.as_deref().unwrap_or("-")))
            .collect::<Vec<_>>()
            .join(" | ");
        write!(f, "{text}")
    }
}

/// Flatten a parsed document to one record per installment.
///
/// Documents without any `nDup` element produce no records.
///
/// # Errors
/// Returns an error if the root element has no namespace.
pub fn normalize(document: &Document) -> Result<Vec<Record>> {
    let namespace = Namespace::from_root(document)?;
    let common = CommonFields::extract(document, &namespace);

    let labels = get_all(document, &namespace, Field::Installment.tag());
    let values = get_all(document, &namespace, Field::InstallmentValue.tag());
    let due_dates = get_all(document, &namespace, Field::DueDate.tag());

    Ok(align_installments(labels, &values, &due_dates)
        .into_iter()
        .map(|installment| Record::new(&common, installment))
        .collect())
}

#[cfg(test)]
mod test_align_installments {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn equal_lengths_pair_by_position() {
        let aligned = align_installments(
            strings(&["001", "002"]),
            &strings(&["10.00", "20.00"]),
            &strings(&["2024-06-01", "2024-07-01"]),
        );
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[1].label, "002");
        assert_eq!(aligned[1].value.as_deref(), Some("20.00"));
        assert_eq!(aligned[1].due_date.as_deref(), Some("2024-07-01"));
    }

    #[test]
    fn short_values_leave_trailing_installments_without_value() {
        let aligned = align_installments(
            strings(&["1", "2", "3"]),
            &strings(&["100.00"]),
            &strings(&["a", "b"]),
        );
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[0].value.as_deref(), Some("100.00"));
        assert_eq!(aligned[1].value, None);
        assert_eq!(aligned[2].value, None);
        assert_eq!(aligned[1].due_date.as_deref(), Some("b"));
        assert_eq!(aligned[2].due_date, None);
    }

    #[test]
    fn extra_values_beyond_labels_are_dropped() {
        let aligned = align_installments(
            strings(&["1"]),
            &strings(&["1.00", "2.00", "3.00"]),
            &strings(&["a", "b", "c"]),
        );
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].value.as_deref(), Some("1.00"));
        assert_eq!(aligned[0].due_date.as_deref(), Some("a"));
    }

    #[test]
    fn no_labels_gives_no_installments() {
        let aligned = align_installments(Vec::new(), &strings(&["1.00"]), &strings(&["a"]));
        assert!(aligned.is_empty());
    }

    #[test]
    fn count_and_absence_follow_list_lengths() {
        for labels in 0..4 {
            for values in 0..4 {
                for dates in 0..4 {
                    let aligned = align_installments(
                        (0..labels).map(|i| i.to_string()).collect(),
                        &(0..values).map(|i| i.to_string()).collect::<Vec<_>>(),
                        &(0..dates).map(|i| i.to_string()).collect::<Vec<_>>(),
                    );
                    assert_eq!(aligned.len(), labels);
                    for (index, installment) in aligned.iter().enumerate() {
                        assert_eq!(installment.value.is_none(), index >= values);
                        assert_eq!(installment.due_date.is_none(), index >= dates);
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod test_normalize {
    use super::*;

    const NFE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe" versao="4.00">
  <NFe>
    <infNFe Id="NFe123">
      <ide><nNF>123</nNF><dhEmi>2024-05-01T10:00:00</dhEmi></ide>
      <emit><xNome>ACME</xNome></emit>
      <cobr>
        <dup><nDup>1/3</nDup><dVenc>2024-06-01</dVenc><vDup>100.00</vDup></dup>
        <dup><nDup>2/3</nDup><dVenc>2024-07-01</dVenc></dup>
      </cobr>
      <infAdic><infCpl>note</infCpl></infAdic>
    </infNFe>
  </NFe>
  <protNFe><infProt><chNFe>ABC</chNFe></infProt></protNFe>
</nfeProc>"#;

    #[test]
    fn one_record_per_installment() {
        let doc = Document::parse(NFE).expect("valid xml");
        let records = normalize(&doc).expect("should normalize");
        assert_eq!(records.len(), 2);

        for record in &records {
            assert_eq!(record.get(Field::InvoiceNumber), Some("123"));
            assert_eq!(record.get(Field::InvoiceKey), Some("ABC"));
            assert_eq!(record.get(Field::CompanyName), Some("ACME"));
            assert_eq!(record.get(Field::IssueDate), Some("2024-05-01T10:00:00"));
            assert_eq!(record.get(Field::ComplementaryInfo), Some("note"));
        }

        assert_eq!(records[0].get(Field::Installment), Some("1/3"));
        assert_eq!(records[0].get(Field::InstallmentValue), Some("100.00"));
        assert_eq!(records[0].get(Field::DueDate), Some("2024-06-01"));
        assert_eq!(records[1].get(Field::Installment), Some("2/3"));
        assert_eq!(records[1].get(Field::InstallmentValue), None);
        assert_eq!(records[1].get(Field::DueDate), Some("2024-07-01"));
    }

    #[test]
    fn record_field_order_matches_insertion() {
        let doc = Document::parse(NFE).expect("valid xml");
        let records = normalize(&doc).expect("should normalize");
        assert_eq!(
            records[0].fields().collect::<Vec<_>>(),
            vec![
                Field::InvoiceNumber,
                Field::InvoiceKey,
                Field::CompanyName,
                Field::IssueDate,
                Field::ComplementaryInfo,
                Field::Installment,
                Field::InstallmentValue,
                Field::DueDate,
            ]
        );
    }

    #[test]
    fn document_without_installments_is_dropped() {
        // Invoices paid upfront have no <dup> block and currently vanish from the export.
        let xml = r#"<nfeProc xmlns="urn:nfe"><nNF>5</nNF><vDup>9.99</vDup></nfeProc>"#;
        let doc = Document::parse(xml).expect("valid xml");
        assert!(normalize(&doc).expect("should normalize").is_empty());
    }

    #[test]
    fn common_fields_take_first_non_blank_match() {
        let xml = r#"<nfeProc xmlns="urn:nfe">
            <emit><xNome> </xNome></emit>
            <emit><xNome>Emitente</xNome></emit>
            <dest><xNome>Destinatario</xNome></dest>
        </nfeProc>"#;
        let doc = Document::parse(xml).expect("valid xml");
        let namespace = Namespace::from_root(&doc).expect("has namespace");
        let common = CommonFields::extract(&doc, &namespace);
        assert_eq!(common.get(Field::CompanyName), Some("Emitente"));
        assert_eq!(common.get(Field::InvoiceNumber), None);
        assert_eq!(common.get(Field::Installment), None);
    }

    #[test]
    fn missing_common_fields_are_absent() {
        let xml = r#"<nfeProc xmlns="urn:nfe"><nDup>001</nDup></nfeProc>"#;
        let doc = Document::parse(xml).expect("valid xml");
        let records = normalize(&doc).expect("should normalize");
        assert_eq!(records.len(), 1);
        assert!(records[0].contains(Field::InvoiceKey));
        assert_eq!(records[0].get(Field::InvoiceKey), None);
        assert_eq!(records[0].get(Field::Installment), Some("001"));
    }

    #[test]
    fn root_without_namespace_fails() {
        let doc = Document::parse("<nfeProc><nDup>1</nDup></nfeProc>").expect("valid xml");
        assert!(normalize(&doc).is_err());
    }
}
