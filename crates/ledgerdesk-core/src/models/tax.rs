use serde::{Deserialize, Serialize};

/// Yearly tax summary shown on the dashboard's reports page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct TaxSummary {
    pub year: i32,
    pub currency: String,
    #[serde(rename = "totalInvoiced")]
    pub total_invoiced: f64,
    #[serde(rename = "totalVat")]
    pub total_vat: f64,
    #[serde(default)]
    pub quarters: Vec<QuarterSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct QuarterSummary {
    pub quarter: u8,
    #[serde(rename = "totalInvoiced")]
    pub total_invoiced: f64,
    #[serde(rename = "totalVat")]
    pub total_vat: f64,
}
