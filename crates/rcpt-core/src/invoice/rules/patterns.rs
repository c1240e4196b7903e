//! Common regex patterns for receipt field rules.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Canonical date, passed through untouched
    pub static ref ISO_DATE: Regex = Regex::new(
        r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$"
    ).unwrap();

    // Separators allowed inside a printed tax ID (010-756-6000-453, 0 1075 66000 45 3)
    pub static ref TAX_ID_SEPARATORS: Regex = Regex::new(
        r"[\s\-.]"
    ).unwrap();

    // Separators inside one whitespace-delimited group (010-756-6000-453)
    pub static ref TAX_ID_GROUP_SEPARATORS: Regex = Regex::new(
        r"[\-.]"
    ).unwrap();

    // ASCII digit runs only; Thai digits are not tax ID digits
    pub static ref DIGIT_RUN: Regex = Regex::new(
        r"[0-9]+"
    ).unwrap();

    // First printed amount: optional sign, digits with thousands commas, decimals
    pub static ref NUMBER: Regex = Regex::new(
        r"-?[0-9][0-9,]*(?:\.[0-9]+)?"
    ).unwrap();

    // Dates embedded in free text
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b[0-9]{1,2}[./\-][0-9]{1,2}[./\-](?:[0-9]{4}|[0-9]{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b[0-9]{4}[./\-][0-9]{1,2}[./\-][0-9]{1,2}\b"
    ).unwrap();

    pub static ref DATE_LONG: Regex = Regex::new(
        r"(?i)\b[0-9]{1,2}[\s\-](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[\s\-][0-9]{4}\b"
    ).unwrap();

    // Negative "item" rows whose description marks them as credits
    pub static ref CREDIT_KEYWORD: Regex = Regex::new(
        r"(?i)cn|credit|refund"
    ).unwrap();

    // Surrounding markdown code fence on a model response
    pub static ref CODE_FENCE: Regex = Regex::new(
        r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```$"
    ).unwrap();
}
