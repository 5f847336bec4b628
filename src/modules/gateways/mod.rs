pub mod services;

pub use services::signature;
pub use services::{
    Charge, ChargeRequest, GatewayCustomer, GatewayPhone, Invoice, InvoiceRequest, PaymentGateway,
    TapClient,
};
