//! Invoice normalization module.

mod normalizer;
pub mod rules;

pub use normalizer::InvoiceNormalizer;
