//! Human-readable document codes (`PO-20240105-0007`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Document families that receive generated codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentPrefix {
    PurchaseOrder,
    Arrival,
    StockOut,
    PointOrder,
    DistributionOrder,
}

impl DocumentPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentPrefix::PurchaseOrder => "PO",
            DocumentPrefix::Arrival => "AR",
            DocumentPrefix::StockOut => "SO",
            DocumentPrefix::PointOrder => "PT",
            DocumentPrefix::DistributionOrder => "DO",
        }
    }

    /// Key under which the daily sequence is allocated.
    pub fn sequence_key(&self, date: NaiveDate) -> String {
        format!("{}:{}", self.as_str(), date.format("%Y%m%d"))
    }
}

pub struct DocumentCode;

impl DocumentCode {
    /// `PREFIX-YYYYMMDD-NNNN`; the sequence grows past four digits when needed.
    pub fn format(prefix: DocumentPrefix, date: NaiveDate, seq: u64) -> String {
        format!("{}-{}-{:04}", prefix.as_str(), date.format("%Y%m%d"), seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_codes() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(DocumentCode::format(DocumentPrefix::PurchaseOrder, d, 7), "PO-20240105-0007");
        assert_eq!(DocumentCode::format(DocumentPrefix::StockOut, d, 12345), "SO-20240105-12345");
        assert_eq!(DocumentPrefix::Arrival.sequence_key(d), "AR:20240105");
    }
}
