//! NFe invoice extraction: field lookup, per-document flattening and batch assembly.

pub mod extract;
pub mod normalize;
pub mod table;

pub use extract::{Namespace, QualifiedName, get_all, get_first};
pub use normalize::{CommonFields, Field, InstallmentTriple, Record, align_installments, normalize};
pub use table::{OutputTable, assemble, assemble_with_progress, order_columns, parse_document, parse_file};
