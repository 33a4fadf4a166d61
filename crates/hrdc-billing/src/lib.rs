pub mod checkout;
pub mod error;
pub mod plans;
pub mod service;
pub mod verifier;

pub use checkout::{payment_reference, CheckoutConfig, CheckoutMetadata, CustomField, PaymentInit};
pub use error::{BillingError, Result};
pub use plans::{SubscriptionPlan, FREE_PLAN, STANDARD_PLAN};
pub use service::BillingService;
pub use verifier::{FunctionVerifier, PaymentVerifier, PaystackVerifier, VerificationOutcome};
