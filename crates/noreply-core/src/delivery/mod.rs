//! Audit log of notification deliveries.

mod model;
mod repository;

pub use model::{DeliveryRecord, DeliveryStatus};
pub use repository::DeliveryLog;
