//! Contact Gateway
//!
//! A contact-form relay whose single write endpoint is guarded by a
//! per-client sliding-window rate limiter:
//!
//! - `rate_limit`: the shared client registry (history, trimming, idle sweep)
//! - `admission`: named policies and the exemption list
//! - `middleware`: the enforcement stage answering 429 on rejection
//! - `handlers`: contact, health and metrics endpoints

pub mod admission;
pub mod app;
pub mod config;
pub mod email;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod template;
pub mod validation;

pub use admission::{AdmissionGuard, ExemptList, RatePolicy, Verdict};
pub use app::build_router;
pub use rate_limit::ClientRegistry;
