mod contact;
mod health;
mod metrics;

pub use contact::contact_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
