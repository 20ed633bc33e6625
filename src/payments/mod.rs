pub mod service;
pub mod webhook;

pub use service::{CheckoutCreated, PaymentService};
pub use webhook::GatewayNotification;
