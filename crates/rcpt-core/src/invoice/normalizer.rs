//! Raw model payload to canonical invoice.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::invoice::*;
use crate::models::raw::{RawExtraction, RawLineItem};

use super::rules::{
    extract_tax_id_value, normalize_date, parse_optional, patterns::CREDIT_KEYWORD,
};

/// Turns arbitrary model output into a canonical [`Invoice`].
///
/// Normalization is total: malformed or missing data degrades to the
/// documented defaults and never produces an error.
#[derive(Debug, Clone, Default)]
pub struct InvoiceNormalizer;

/// A line item before filtering and numbering.
struct DraftItem {
    line_type: LineType,
    description: String,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    amount: Decimal,
}

impl InvoiceNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a raw payload.
    pub fn normalize(&self, raw: &RawExtraction) -> Invoice {
        self.normalize_with_tokens(raw, None)
    }

    /// Normalize a raw payload, attaching the token count billed for it.
    pub fn normalize_with_tokens(&self, raw: &RawExtraction, token_used: Option<u64>) -> Invoice {
        let drafts: Vec<DraftItem> = raw.line_items().iter().map(draft_item).collect();
        let raw_count = drafts.len();

        let line_items: Vec<LineItem> = drafts
            .into_iter()
            .filter(|d| !d.description.is_empty() && !d.amount.is_zero())
            .enumerate()
            .map(|(i, d)| LineItem {
                item_number: (i + 1) as u32,
                line_type: d.line_type,
                description: d.description,
                quantity: d.quantity,
                unit_price: d.unit_price,
                amount: d.amount,
            })
            .collect();

        if line_items.len() < raw_count {
            debug!(
                kept = line_items.len(),
                dropped = raw_count - line_items.len(),
                "Dropped line items without description or amount"
            );
        }

        let has_vat_line = line_items.iter().any(|i| i.line_type == LineType::Vat);
        let vat_amount = if has_vat_line {
            Some(Decimal::ZERO)
        } else {
            parse_optional(raw.field("vatAmount"))
        };

        let confidence = parse_optional(raw.field("confidence"))
            .map(|c| c.clamp(Decimal::ZERO, Decimal::ONE))
            .unwrap_or(Decimal::new(5, 1));

        let invoice = Invoice {
            document_type: raw
                .text("documentType")
                .and_then(|s| DocumentType::parse(&s))
                .unwrap_or_default(),
            invoice_number: raw.text("invoiceNumber"),
            invoice_date: raw.text("invoiceDate").and_then(|s| normalize_date(&s)),
            seller_name: raw.text("sellerName"),
            seller_tax_id: raw.field("sellerTaxId").and_then(extract_tax_id_value),
            buyer_name: raw.text("buyerName"),
            buyer_tax_id: raw.field("buyerTaxId").and_then(extract_tax_id_value),
            expense_category: raw
                .text("expenseCategory")
                .and_then(|s| ExpenseCategory::parse(&s))
                .unwrap_or_default(),
            line_items,
            subtotal: parse_optional(raw.field("subtotal")),
            vat_amount,
            grand_total: parse_optional(raw.field("grandTotal")).unwrap_or(Decimal::ZERO),
            confidence,
            token_used,
        };

        debug!(
            document_type = invoice.document_type.as_str(),
            items = invoice.line_items.len(),
            grand_total = %invoice.grand_total,
            "Normalized invoice"
        );

        invoice
    }
}

fn draft_item(raw: &RawLineItem<'_>) -> DraftItem {
    let quantity = parse_optional(raw.field("quantity")).unwrap_or(Decimal::ONE);
    let parsed_amount = parse_optional(raw.field("amount"));
    let parsed_price = parse_optional(raw.field("unitPrice"));

    let (unit_price, amount) = match (parsed_price, parsed_amount) {
        (Some(price), Some(amount)) => (Some(price), amount),
        (None, Some(amount)) => (amount.checked_div(quantity), amount),
        (Some(price), None) => (
            Some(price),
            price.checked_mul(quantity).unwrap_or(Decimal::ZERO),
        ),
        (None, None) => (None, Decimal::ZERO),
    };

    let description = raw.text("description").unwrap_or_default();
    let line_type = resolve_line_type(raw.text("lineType").as_deref(), amount, &description);

    DraftItem {
        line_type,
        description,
        quantity,
        unit_price,
        amount,
    }
}

/// Models often tag negative rows as plain items; reclassify those from
/// the description.
fn resolve_line_type(tag: Option<&str>, amount: Decimal, description: &str) -> LineType {
    let line_type = tag.and_then(LineType::parse).unwrap_or_default();

    if line_type == LineType::Item && amount.is_sign_negative() && !amount.is_zero() {
        if CREDIT_KEYWORD.is_match(description) {
            return LineType::Credit;
        }
        return LineType::Discount;
    }

    line_type
}
