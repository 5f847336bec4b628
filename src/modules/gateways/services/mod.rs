pub mod gateway_trait;
pub mod signature;
pub mod tap;

pub use gateway_trait::{
    Charge, ChargeRequest, GatewayCustomer, GatewayPhone, Invoice, InvoiceRequest, PaymentGateway,
};
pub use tap::TapClient;
