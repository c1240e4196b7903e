//! Fixed spreadsheet column layout.

/// One column of the expense sheet, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ProcessedAt,
    ReceiptId,
    InvoiceDate,
    InvoiceMonth,
    InvoiceNumber,
    DocumentType,
    SellerName,
    SellerTaxId,
    ExpenseCategory,
    ItemNumber,
    LineType,
    Description,
    Quantity,
    UnitPrice,
    Amount,
    Subtotal,
    AdditionalVat,
    TotalInvoiceVat,
    GrandTotal,
    ImageUrl,
    Confidence,
    TokenUsed,
    UserId,
    UserName,
}

/// Number of columns in the layout.
pub const COLUMN_COUNT: usize = 24;

impl Column {
    /// Every column, in sheet order.
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::ProcessedAt,
        Column::ReceiptId,
        Column::InvoiceDate,
        Column::InvoiceMonth,
        Column::InvoiceNumber,
        Column::DocumentType,
        Column::SellerName,
        Column::SellerTaxId,
        Column::ExpenseCategory,
        Column::ItemNumber,
        Column::LineType,
        Column::Description,
        Column::Quantity,
        Column::UnitPrice,
        Column::Amount,
        Column::Subtotal,
        Column::AdditionalVat,
        Column::TotalInvoiceVat,
        Column::GrandTotal,
        Column::ImageUrl,
        Column::Confidence,
        Column::TokenUsed,
        Column::UserId,
        Column::UserName,
    ];

    /// Header text. Must match the existing sheet byte for byte.
    pub fn header(&self) -> &'static str {
        match self {
            Column::ProcessedAt => "Processed At",
            Column::ReceiptId => "Receipt ID",
            Column::InvoiceDate => "Invoice Date",
            Column::InvoiceMonth => "Invoice Month",
            Column::InvoiceNumber => "Invoice Number",
            Column::DocumentType => "Document Type",
            Column::SellerName => "Seller Name",
            Column::SellerTaxId => "Seller Tax ID",
            Column::ExpenseCategory => "Expense Category",
            Column::ItemNumber => "Item #",
            Column::LineType => "Line Type",
            Column::Description => "Description",
            Column::Quantity => "Quantity",
            Column::UnitPrice => "Unit Price",
            Column::Amount => "Amount",
            Column::Subtotal => "Subtotal",
            Column::AdditionalVat => "Additional VAT 7%",
            Column::TotalInvoiceVat => "Total Inv VAT 7%",
            Column::GrandTotal => "Grand Total",
            Column::ImageUrl => "Image URL",
            Column::Confidence => "Confidence",
            Column::TokenUsed => "Token Used",
            Column::UserId => "User ID",
            Column::UserName => "User Name",
        }
    }

    /// Zero-based position in the row.
    pub fn index(&self) -> usize {
        Column::ALL.iter().position(|c| c == self).unwrap_or(0)
    }

    /// Columns that vary per line item.
    pub fn is_item_column(&self) -> bool {
        matches!(
            self,
            Column::ItemNumber
                | Column::LineType
                | Column::Description
                | Column::Quantity
                | Column::UnitPrice
                | Column::Amount
                | Column::AdditionalVat
        )
    }
}

/// Header row, in sheet order.
pub fn headers() -> Vec<&'static str> {
    Column::ALL.iter().map(|c| c.header()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout() {
        let headers = headers();
        assert_eq!(headers.len(), COLUMN_COUNT);
        assert_eq!(headers[0], "Processed At");
        assert_eq!(headers[9], "Item #");
        assert_eq!(headers[16], "Additional VAT 7%");
        assert_eq!(headers[23], "User Name");
    }

    #[test]
    fn test_index() {
        assert_eq!(Column::ProcessedAt.index(), 0);
        assert_eq!(Column::GrandTotal.index(), 18);
        assert_eq!(Column::UserName.index(), 23);
    }
}
