//! Instruction sent with every document image.

use crate::models::invoice::{DocumentType, ExpenseCategory, LineType};

/// Build the extraction prompt.
///
/// The enum vocabularies are taken from the canonical model types so the
/// prompt and the normalizer cannot drift apart.
pub fn extraction_prompt() -> String {
    let document_types = join(DocumentType::ALL.iter().map(|d| d.as_str()));
    let categories = join(ExpenseCategory::ALL.iter().map(|c| c.as_str()));
    let line_types = join(LineType::ALL.iter().map(|l| l.as_str()));

    format!(
        r#"You read receipts and tax invoices, often Thai, and return their data as JSON.

Return exactly one JSON object and nothing else:
{{
  "documentType": one of {document_types},
  "invoiceNumber": string or null,
  "invoiceDate": "YYYY-MM-DD" or null (convert Buddhist Era years to Gregorian),
  "sellerName": string or null,
  "sellerTaxId": 13-digit string or null,
  "buyerName": string or null,
  "buyerTaxId": 13-digit string or null,
  "expenseCategory": one of {categories},
  "lineItems": [
    {{
      "lineType": one of {line_types},
      "description": string,
      "quantity": number,
      "unitPrice": number or null,
      "amount": number (negative for discounts and credits)
    }}
  ],
  "subtotal": number or null,
  "vatAmount": number or null,
  "grandTotal": number,
  "confidence": number between 0 and 1
}}

Rules:
- Copy amounts as plain numbers without currency symbols or thousands separators.
- List VAT as a "vat" line item only when the receipt prints it as a line; otherwise use vatAmount.
- Use null for anything you cannot read. Do not guess."#
    )
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}
