use serde::{Deserialize, Serialize};

/// Billing lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "Draft"),
            InvoiceStatus::Sent => write!(f, "Sent"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Overdue => write!(f, "Overdue"),
            InvoiceStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    #[serde(rename = "customerId")]
    pub customer_id: i64,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    pub status: InvoiceStatus,
    pub currency: String,
    #[serde(rename = "issueDate")]
    pub issue_date: Option<String>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
    pub subtotal: f64,
    #[serde(rename = "vatAmount")]
    pub vat_amount: f64,
    pub total: f64,
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: f64,
    #[serde(rename = "vatRate")]
    pub vat_rate: f64,
    #[serde(rename = "lineTotal")]
    pub line_total: f64,
}

/// Payload for creating an invoice.
#[derive(Debug, Clone, Serialize)]
pub struct NewInvoice {
    #[serde(rename = "customerId")]
    pub customer_id: i64,
    pub currency: String,
    #[serde(rename = "issueDate")]
    pub issue_date: String,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
    pub lines: Vec<NewInvoiceLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInvoiceLine {
    pub description: String,
    pub quantity: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: f64,
    #[serde(rename = "vatRate")]
    pub vat_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceListResponse {
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub total: i64,
}
