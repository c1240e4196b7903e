//! Canonical invoice data model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A normalized invoice, receipt, credit note or quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Kind of document.
    pub document_type: DocumentType,

    /// Invoice/receipt number as printed.
    pub invoice_number: Option<String>,

    /// `YYYY-MM-DD`, or a `'`-prefixed literal when the date could not be read.
    pub invoice_date: Option<String>,

    /// Seller (issuer) name.
    pub seller_name: Option<String>,

    /// 13-digit seller tax ID.
    pub seller_tax_id: Option<String>,

    /// Buyer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,

    /// 13-digit buyer tax ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_tax_id: Option<String>,

    /// Bookkeeping category.
    pub expense_category: ExpenseCategory,

    /// Surviving line items, numbered from 1.
    pub line_items: Vec<LineItem>,

    /// Amount before VAT.
    pub subtotal: Option<Decimal>,

    /// VAT reported as an invoice total. Zero when VAT is carried as a line item.
    pub vat_amount: Option<Decimal>,

    /// Amount payable.
    pub grand_total: Decimal,

    /// Model confidence in `[0, 1]`.
    pub confidence: Decimal,

    /// Tokens billed for the extraction call.
    pub token_used: Option<u64>,
}

impl Invoice {
    /// Whether VAT is represented as one of the line items.
    pub fn has_vat_line(&self) -> bool {
        self.line_items.iter().any(|i| i.line_type == LineType::Vat)
    }

    /// Sum of the line item amounts.
    pub fn line_total(&self) -> Decimal {
        self.line_items.iter().map(|i| i.amount).sum()
    }

    /// Check the invoice for inconsistencies worth a human look.
    ///
    /// Nothing here is fatal; the list is informational.
    pub fn review_notes(&self) -> Vec<String> {
        let mut notes = Vec::new();

        if self.invoice_number.is_none() {
            notes.push("Missing invoice number".to_string());
        }

        match &self.invoice_date {
            None => notes.push("Missing invoice date".to_string()),
            Some(d) if d.starts_with(crate::invoice::rules::TEXT_MARKER) => {
                notes.push(format!("Unreadable invoice date {}", d))
            }
            Some(_) => {}
        }

        if self.line_items.is_empty() {
            notes.push("No line items".to_string());
        }

        if self.grand_total.is_zero() {
            notes.push("Grand total is zero".to_string());
        }

        if !self.line_items.is_empty() {
            let total = self.line_total();
            if (total - self.grand_total).abs() > Decimal::new(1, 2) {
                notes.push(format!(
                    "Line item total ({}) differs from grand total ({})",
                    total, self.grand_total
                ));
            }
        }

        notes
    }
}

/// A single line on the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// 1-based position among surviving items.
    pub item_number: u32,

    /// What kind of line this is.
    pub line_type: LineType,

    /// Product/service description.
    pub description: String,

    /// Quantity (defaults to 1).
    pub quantity: Decimal,

    /// Price per unit, when known or derivable.
    pub unit_price: Option<Decimal>,

    /// Line amount. Negative for discounts and credits.
    pub amount: Decimal,
}

/// Classification of a line item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Item,
    Discount,
    Credit,
    Service,
    Vat,
}

impl LineType {
    pub const ALL: [LineType; 5] = [
        LineType::Item,
        LineType::Discount,
        LineType::Credit,
        LineType::Service,
        LineType::Vat,
    ];

    /// Parse a line type tag, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "item" => Some(LineType::Item),
            "discount" => Some(LineType::Discount),
            "credit" => Some(LineType::Credit),
            "service" => Some(LineType::Service),
            "vat" => Some(LineType::Vat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Item => "item",
            LineType::Discount => "discount",
            LineType::Credit => "credit",
            LineType::Service => "service",
            LineType::Vat => "vat",
        }
    }
}

/// Type of document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "Tax Invoice")]
    TaxInvoice,
    #[default]
    Receipt,
    #[serde(rename = "Credit Note")]
    CreditNote,
    Quotation,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::TaxInvoice,
        DocumentType::Receipt,
        DocumentType::CreditNote,
        DocumentType::Quotation,
    ];

    /// Parse a document type label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tax invoice" => Some(DocumentType::TaxInvoice),
            "receipt" => Some(DocumentType::Receipt),
            "credit note" => Some(DocumentType::CreditNote),
            "quotation" => Some(DocumentType::Quotation),
            _ => None,
        }
    }

    /// Label as written to the sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::TaxInvoice => "Tax Invoice",
            DocumentType::Receipt => "Receipt",
            DocumentType::CreditNote => "Credit Note",
            DocumentType::Quotation => "Quotation",
        }
    }
}

/// Expense category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Food,
    Travel,
    Office,
    Marketing,
    Utilities,
    #[default]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Food,
        ExpenseCategory::Travel,
        ExpenseCategory::Office,
        ExpenseCategory::Marketing,
        ExpenseCategory::Utilities,
        ExpenseCategory::Other,
    ];

    /// Parse a category label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "food" => Some(ExpenseCategory::Food),
            "travel" => Some(ExpenseCategory::Travel),
            "office" => Some(ExpenseCategory::Office),
            "marketing" => Some(ExpenseCategory::Marketing),
            "utilities" => Some(ExpenseCategory::Utilities),
            "other" => Some(ExpenseCategory::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Travel => "Travel",
            ExpenseCategory::Office => "Office",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Other => "Other",
        }
    }
}

impl Default for Invoice {
    fn default() -> Self {
        Self {
            document_type: DocumentType::default(),
            invoice_number: None,
            invoice_date: None,
            seller_name: None,
            seller_tax_id: None,
            buyer_name: None,
            buyer_tax_id: None,
            expense_category: ExpenseCategory::default(),
            line_items: Vec::new(),
            subtotal: None,
            vat_amount: None,
            grand_total: Decimal::ZERO,
            confidence: Decimal::new(5, 1),
            token_used: None,
        }
    }
}
