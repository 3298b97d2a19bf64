//! Typed rows of the two input datasets.
//!
//! All fields are raw text. IDs are never coerced to numbers, so leading zeros and
//! long identifiers survive unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns the orders file must carry.
pub const ORDER_COLUMNS: [&str; 2] = ["customer_id", "order_id"];

/// Columns the barcodes file must carry.
pub const BARCODE_COLUMNS: [&str; 2] = ["order_id", "barcode"];

/// One row of the orders file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderRecord {
    pub customer_id: String,
    pub order_id: String,
}

impl OrderRecord {
    pub fn new(customer_id: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            order_id: order_id.into(),
        }
    }
}

/// One row of the barcodes file. An empty `barcode` field reads as `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarcodeRecord {
    pub order_id: String,
    pub barcode: Option<String>,
}

impl BarcodeRecord {
    pub fn new(order_id: impl Into<String>, barcode: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            barcode: Some(barcode.into()),
        }
    }

    /// A record without a barcode value.
    pub fn missing(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            barcode: None,
        }
    }

    /// The barcode, if present and non-blank.
    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref().filter(|b| !b.trim().is_empty())
    }

    #[must_use]
    pub fn has_barcode(&self) -> bool {
        self.barcode().is_some()
    }
}

impl fmt::Display for BarcodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.order_id, self.barcode.as_deref().unwrap_or("NaN"))
    }
}
