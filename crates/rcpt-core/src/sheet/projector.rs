//! Canonical invoice to spreadsheet rows.

use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::invoice::rules::period_of;
use crate::models::config::SheetConfig;
use crate::models::invoice::{Invoice, LineItem};

use super::schema::Column;
use super::{Actor, Cell, SheetRow};

/// Hands out `R<YYMMDD>-<NNN>` receipt IDs.
///
/// The sequence restarts at 1 on the first call of each calendar day. State
/// is process-local: a restart begins again at 1, so IDs are unique only
/// within one running process.
#[derive(Debug, Default)]
pub struct ReceiptIdGenerator {
    state: Mutex<Option<(NaiveDate, u32)>>,
}

impl ReceiptIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next receipt ID for `date`.
    pub fn next(&self, date: NaiveDate) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let seq = match *state {
            Some((day, seq)) if day == date => seq + 1,
            _ => 1,
        };
        *state = Some((date, seq));
        format!("R{}-{:03}", date.format("%y%m%d"), seq)
    }
}

/// Rows produced for one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub receipt_id: String,
    pub rows: Vec<SheetRow>,
}

/// Projects invoices onto the fixed 24-column layout.
#[derive(Debug)]
pub struct SheetRowProjector {
    receipt_ids: ReceiptIdGenerator,
    additional_vat_rate: Decimal,
    timestamp_format: String,
}

impl SheetRowProjector {
    pub fn new() -> Self {
        Self::from_config(&SheetConfig::default())
    }

    pub fn from_config(config: &SheetConfig) -> Self {
        Self {
            receipt_ids: ReceiptIdGenerator::new(),
            additional_vat_rate: config.additional_vat_rate,
            timestamp_format: config.timestamp_format.clone(),
        }
    }

    /// Project an invoice: one row per line item, or a single row with blank
    /// item columns when there are none.
    pub fn project(
        &self,
        invoice: &Invoice,
        image_url: &str,
        processed_at: NaiveDateTime,
        actor: &Actor,
    ) -> Projection {
        let receipt_id = self.receipt_ids.next(processed_at.date());
        let header = HeaderFields {
            processed_at: processed_at.format(&self.timestamp_format).to_string(),
            receipt_id: receipt_id.clone(),
            invoice_month: invoice.invoice_date.as_deref().and_then(period_of),
            image_url,
            actor,
        };

        let rows: Vec<SheetRow> = if invoice.line_items.is_empty() {
            vec![self.row(invoice, &header, None)]
        } else {
            invoice
                .line_items
                .iter()
                .map(|item| self.row(invoice, &header, Some(item)))
                .collect()
        };

        debug!(receipt_id = %receipt_id, rows = rows.len(), "Projected invoice");

        Projection { receipt_id, rows }
    }

    fn row(&self, invoice: &Invoice, header: &HeaderFields<'_>, item: Option<&LineItem>) -> SheetRow {
        let cells = Column::ALL
            .iter()
            .map(|column| match column {
                Column::ProcessedAt => Cell::text(&header.processed_at),
                Column::ReceiptId => Cell::text(&header.receipt_id),
                Column::InvoiceDate => Cell::opt_text(invoice.invoice_date.as_deref()),
                Column::InvoiceMonth => Cell::opt_text(header.invoice_month.as_deref()),
                Column::InvoiceNumber => Cell::opt_text(invoice.invoice_number.as_deref()),
                Column::DocumentType => Cell::text(invoice.document_type.as_str()),
                Column::SellerName => Cell::opt_text(invoice.seller_name.as_deref()),
                Column::SellerTaxId => Cell::opt_text(invoice.seller_tax_id.as_deref()),
                Column::ExpenseCategory => Cell::text(invoice.expense_category.as_str()),
                Column::ItemNumber => match item {
                    Some(i) => Cell::Number(Decimal::from(i.item_number)),
                    None => Cell::Empty,
                },
                Column::LineType => match item {
                    Some(i) => Cell::text(i.line_type.as_str()),
                    None => Cell::Empty,
                },
                Column::Description => match item {
                    Some(i) => Cell::text(&i.description),
                    None => Cell::Empty,
                },
                Column::Quantity => match item {
                    Some(i) => Cell::Number(i.quantity),
                    None => Cell::Empty,
                },
                Column::UnitPrice => Cell::opt_number(item.and_then(|i| i.unit_price)),
                Column::Amount => Cell::opt_number(item.map(|i| i.amount)),
                Column::Subtotal => Cell::opt_number(invoice.subtotal),
                Column::AdditionalVat => Cell::opt_number(
                    item.and_then(|i| self.additional_vat(invoice, i)),
                ),
                Column::TotalInvoiceVat => Cell::opt_number(invoice.vat_amount),
                Column::GrandTotal => Cell::Number(invoice.grand_total),
                Column::ImageUrl => Cell::text(header.image_url),
                Column::Confidence => Cell::Number(invoice.confidence),
                Column::TokenUsed => Cell::opt_number(invoice.token_used.map(Decimal::from)),
                Column::UserId => Cell::text(&header.actor.id),
                Column::UserName => Cell::text(&header.actor.display_name),
            })
            .collect();

        SheetRow::new(cells)
    }

    /// Estimated VAT on a positive line when the receipt reported VAT only
    /// as an invoice total.
    fn additional_vat(&self, invoice: &Invoice, item: &LineItem) -> Option<Decimal> {
        let reported = invoice.vat_amount?;
        if reported.is_zero() || item.amount <= Decimal::ZERO {
            return None;
        }

        let mut vat = (item.amount * self.additional_vat_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        vat.rescale(2);
        Some(vat)
    }
}

impl Default for SheetRowProjector {
    fn default() -> Self {
        Self::new()
    }
}

struct HeaderFields<'a> {
    processed_at: String,
    receipt_id: String,
    invoice_month: Option<String>,
    image_url: &'a str,
    actor: &'a Actor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{DocumentType, LineType};
    use crate::sheet::schema::COLUMN_COUNT;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 15, 0)
            .unwrap()
    }

    fn actor() -> Actor {
        Actor::new("U123", "Somchai")
    }

    fn item(n: u32, line_type: LineType, description: &str, amount: &str) -> LineItem {
        LineItem {
            item_number: n,
            line_type,
            description: description.to_string(),
            quantity: Decimal::ONE,
            unit_price: Some(dec(amount)),
            amount: dec(amount),
        }
    }

    fn invoice_with(items: Vec<LineItem>, vat: Option<&str>) -> Invoice {
        Invoice {
            document_type: DocumentType::TaxInvoice,
            invoice_number: Some("INV-9".to_string()),
            invoice_date: Some("2026-01-11".to_string()),
            seller_name: Some("Siam Spa".to_string()),
            seller_tax_id: Some("0107566000453".to_string()),
            line_items: items,
            vat_amount: vat.map(dec),
            grand_total: dec("1080"),
            confidence: dec("0.9"),
            token_used: Some(900),
            ..Invoice::default()
        }
    }

    #[test]
    fn test_one_row_per_item() {
        let projector = SheetRowProjector::new();
        let invoice = invoice_with(
            vec![
                item(1, LineType::Item, "Massage 60 min", "1200"),
                item(2, LineType::Discount, "ส่วนลด 10%", "-120"),
            ],
            None,
        );

        let projection = projector.project(&invoice, "https://files/x.jpg", at(2026, 1, 12, 9), &actor());
        assert_eq!(projection.rows.len(), 2);
        assert!(projection.rows.iter().all(|r| r.len() == COLUMN_COUNT));

        let first = &projection.rows[0];
        assert_eq!(first.get(Column::ProcessedAt), &Cell::text("2026-01-12 09:15:00"));
        assert_eq!(first.get(Column::ReceiptId), &Cell::text("R260112-001"));
        assert_eq!(first.get(Column::InvoiceMonth), &Cell::text("202601"));
        assert_eq!(first.get(Column::DocumentType), &Cell::text("Tax Invoice"));
        assert_eq!(first.get(Column::ItemNumber), &Cell::Number(Decimal::ONE));
        assert_eq!(first.get(Column::Description), &Cell::text("Massage 60 min"));
        assert_eq!(first.get(Column::UserName), &Cell::text("Somchai"));
        assert_eq!(first.get(Column::TokenUsed), &Cell::Number(dec("900")));

        let second = &projection.rows[1];
        assert_eq!(second.get(Column::ReceiptId), &Cell::text("R260112-001"));
        assert_eq!(second.get(Column::LineType), &Cell::text("discount"));
        assert_eq!(second.get(Column::Amount), &Cell::Number(dec("-120")));
        assert_eq!(second.get(Column::GrandTotal), first.get(Column::GrandTotal));
    }

    #[test]
    fn test_no_items_single_blank_row() {
        let projector = SheetRowProjector::new();
        let invoice = invoice_with(Vec::new(), Some("70"));

        let projection = projector.project(&invoice, "", at(2026, 1, 12, 9), &actor());
        assert_eq!(projection.rows.len(), 1);

        let row = &projection.rows[0];
        assert_eq!(row.len(), COLUMN_COUNT);
        for column in Column::ALL.iter().filter(|c| c.is_item_column()) {
            assert_eq!(row.get(*column), &Cell::Empty, "{:?}", column);
        }
        assert_eq!(row.get(Column::GrandTotal), &Cell::Number(dec("1080")));
        assert_eq!(row.get(Column::TotalInvoiceVat), &Cell::Number(dec("70")));
    }

    #[test]
    fn test_additional_vat_only_with_reported_total() {
        let projector = SheetRowProjector::new();
        let items = vec![
            item(1, LineType::Item, "Room", "1000"),
            item(2, LineType::Discount, "Promo", "-100"),
            item(3, LineType::Item, "Minibar", "99.50"),
        ];

        let with_vat = projector.project(&invoice_with(items.clone(), Some("63")), "", at(2026, 1, 12, 9), &actor());
        let vat: Vec<String> = with_vat
            .rows
            .iter()
            .map(|r| r.get(Column::AdditionalVat).to_string())
            .collect();
        assert_eq!(vat, vec!["70.00", "", "6.97"]);

        let zero_vat = projector.project(&invoice_with(items.clone(), Some("0")), "", at(2026, 1, 12, 9), &actor());
        assert!(zero_vat.rows.iter().all(|r| r.get(Column::AdditionalVat) == &Cell::Empty));

        let no_vat = projector.project(&invoice_with(items, None), "", at(2026, 1, 12, 9), &actor());
        assert!(no_vat.rows.iter().all(|r| r.get(Column::AdditionalVat) == &Cell::Empty));
    }

    #[test]
    fn test_receipt_ids_reset_daily() {
        let ids = ReceiptIdGenerator::new();
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();

        assert_eq!(ids.next(day1), "R260111-001");
        assert_eq!(ids.next(day1), "R260111-002");
        assert_eq!(ids.next(day2), "R260112-001");
        assert_eq!(ids.next(day2), "R260112-002");
    }

    #[test]
    fn test_unreadable_date_has_blank_month() {
        let projector = SheetRowProjector::new();
        let mut invoice = invoice_with(Vec::new(), None);
        invoice.invoice_date = Some("'smudged".to_string());

        let projection = projector.project(&invoice, "", at(2026, 1, 12, 9), &actor());
        let row = &projection.rows[0];
        assert_eq!(row.get(Column::InvoiceDate), &Cell::text("'smudged"));
        assert_eq!(row.get(Column::InvoiceMonth), &Cell::Empty);
    }
}
