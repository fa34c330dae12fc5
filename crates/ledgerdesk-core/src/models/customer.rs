use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    #[serde(rename = "vatNumber")]
    pub vat_number: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerListResponse {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub total: i64,
}
