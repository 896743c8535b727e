//! Purchase flow: price a service, check funds, deliver, then settle.

pub mod orchestrator;
pub mod pricing;

pub use orchestrator::{Orchestrator, PurchaseError, Receipt};
pub use pricing::Quote;
