//! Rule-based field parsing for receipts.

pub mod dates;
pub mod numbers;
pub mod patterns;
pub mod tax_id;

pub use dates::{DateExtractor, TEXT_MARKER, normalize_date, parse_date, period_of};
pub use numbers::{parse_number, parse_number_str, parse_optional};
pub use tax_id::{TaxIdExtractor, extract_tax_id, extract_tax_id_value};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}
