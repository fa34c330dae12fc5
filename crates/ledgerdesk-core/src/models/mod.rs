//! Data models for the LedgerDesk API.
//!
//! Auth wire types follow the snake_case contract of the authentication
//! endpoints; business models mirror the camelCase JSON of the main API.

pub mod auth;
pub mod customer;
pub mod invoice;
pub mod tax;

pub use auth::{AuthErrorBody, TokenResponse};
pub use customer::{Customer, CustomerListResponse};
pub use invoice::{
    Invoice, InvoiceLine, InvoiceListResponse, InvoiceStatus, NewInvoice, NewInvoiceLine,
};
pub use tax::{QuarterSummary, TaxSummary};
