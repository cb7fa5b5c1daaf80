//! Typed sales transactions parsed from loosely-typed rows.

use chrono::{NaiveDate, NaiveDateTime};
use sales_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raw row: column name to JSON string or number.
pub type RawRow = BTreeMap<String, serde_json::Value>;

/// Column names of the sales dataset.
pub mod columns {
    pub const ORDER_NUMBER: &str = "ORDERNUMBER";
    pub const QUANTITY: &str = "QUANTITYORDERED";
    pub const PRICE_EACH: &str = "PRICEEACH";
    pub const SALES: &str = "SALES";
    pub const ORDER_DATE: &str = "ORDERDATE";
    pub const STATUS: &str = "STATUS";
    pub const PRODUCT_LINE: &str = "PRODUCTLINE";
    pub const PRODUCT_CODE: &str = "PRODUCTCODE";
    pub const CUSTOMER_NAME: &str = "CUSTOMERNAME";
    pub const PHONE: &str = "PHONE";
    pub const CITY: &str = "CITY";
    pub const STATE: &str = "STATE";
    pub const COUNTRY: &str = "COUNTRY";
    pub const TERRITORY: &str = "TERRITORY";
    pub const CONTACT_FIRST_NAME: &str = "CONTACTFIRSTNAME";
    pub const CONTACT_LAST_NAME: &str = "CONTACTLASTNAME";
    pub const DEAL_SIZE: &str = "DEALSIZE";
}

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M", "%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// One order line. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub order_number: u64,
    pub quantity: f64,
    pub price_each: f64,
    /// Order amount
    pub sales: f64,
    pub order_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub product_line: Option<String>,
    pub product_code: String,
    pub customer_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub territory: Option<String>,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub deal_size: Option<String>,
}

impl SalesRecord {
    /// Parse a raw row.
    ///
    /// Missing or unparsable numbers become zero and missing text fields stay
    /// empty. Only a blank customer name or product code is an error.
    pub fn from_row(row: &RawRow) -> AppResult<Self> {
        let customer_name = text(row, columns::CUSTOMER_NAME).ok_or_else(|| {
            AppError::Validation(format!("Row is missing {}", columns::CUSTOMER_NAME))
        })?;
        let product_code = text(row, columns::PRODUCT_CODE).ok_or_else(|| {
            AppError::Validation(format!("Row is missing {}", columns::PRODUCT_CODE))
        })?;

        Ok(Self {
            order_number: number(row, columns::ORDER_NUMBER).max(0.0) as u64,
            quantity: number(row, columns::QUANTITY),
            price_each: number(row, columns::PRICE_EACH),
            sales: number(row, columns::SALES),
            order_date: text(row, columns::ORDER_DATE).and_then(|d| parse_date(&d)),
            status: text(row, columns::STATUS),
            product_line: text(row, columns::PRODUCT_LINE),
            product_code,
            customer_name,
            phone: text(row, columns::PHONE),
            city: text(row, columns::CITY),
            state: text(row, columns::STATE),
            country: text(row, columns::COUNTRY),
            territory: text(row, columns::TERRITORY),
            contact_first_name: text(row, columns::CONTACT_FIRST_NAME),
            contact_last_name: text(row, columns::CONTACT_LAST_NAME),
            deal_size: text(row, columns::DEAL_SIZE),
        })
    }

    /// "First Last", or whichever half is present.
    pub fn contact_name(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .contact_first_name
            .iter()
            .chain(self.contact_last_name.iter())
            .map(String::as_str)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn is_shipped(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("shipped"))
            .unwrap_or(false)
    }
}

/// Trimmed, non-empty text value. Numbers are rendered as text.
fn text(row: &RawRow, column: &str) -> Option<String> {
    match row.get(column)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(row: &RawRow, column: &str) -> f64 {
    match row.get(column) {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                return 0.0;
            }
            cleaned.parse().unwrap_or_else(|_| {
                tracing::debug!("Non-numeric {} value '{}', using 0", column, s);
                0.0
            })
        }
        _ => 0.0,
    }
}

/// Parse the date formats seen in sales exports.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_row_parses_strings_and_numbers() {
        let record = SalesRecord::from_row(&row(&[
            ("ORDERNUMBER", json!(10107)),
            ("QUANTITYORDERED", json!("30")),
            ("PRICEEACH", json!(95.7)),
            ("SALES", json!("2,871.00")),
            ("ORDERDATE", json!("2/24/2003 0:00")),
            ("STATUS", json!("Shipped")),
            ("PRODUCTLINE", json!("Motorcycles")),
            ("PRODUCTCODE", json!("S10_1678")),
            ("CUSTOMERNAME", json!("Land of Toys Inc.")),
            ("CONTACTFIRSTNAME", json!("Kwai")),
            ("CONTACTLASTNAME", json!("Yu")),
            ("TERRITORY", json!("NA")),
        ]))
        .unwrap();

        assert_eq!(record.order_number, 10107);
        assert_eq!(record.quantity, 30.0);
        assert_eq!(record.sales, 2871.0);
        assert_eq!(record.order_date, NaiveDate::from_ymd_opt(2003, 2, 24));
        assert!(record.is_shipped());
        assert_eq!(record.contact_name().as_deref(), Some("Kwai Yu"));
        assert_eq!(record.territory.as_deref(), Some("NA"));
    }

    #[test]
    fn test_missing_fields_default() {
        let record = SalesRecord::from_row(&row(&[
            ("PRODUCTCODE", json!("S10_1678")),
            ("CUSTOMERNAME", json!("Acme")),
            ("SALES", json!("not a number")),
            ("STATE", json!("   ")),
        ]))
        .unwrap();

        assert_eq!(record.sales, 0.0);
        assert_eq!(record.quantity, 0.0);
        assert!(record.state.is_none());
        assert!(record.order_date.is_none());
        assert!(record.contact_name().is_none());
    }

    #[test]
    fn test_blank_identifiers_are_validation_errors() {
        let missing_name = SalesRecord::from_row(&row(&[("PRODUCTCODE", json!("S10_1678"))]));
        assert!(matches!(missing_name, Err(AppError::Validation(_))));

        let blank_code = SalesRecord::from_row(&row(&[
            ("CUSTOMERNAME", json!("Acme")),
            ("PRODUCTCODE", json!("  ")),
        ]));
        assert!(matches!(blank_code, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2004, 11, 5);
        assert_eq!(parse_date("11/5/2004 0:00"), expected);
        assert_eq!(parse_date("11/05/2004"), expected);
        assert_eq!(parse_date("2004-11-05 00:00:00"), expected);
        assert_eq!(parse_date("2004-11-05"), expected);
        assert_eq!(parse_date("yesterday"), None);
    }
}
