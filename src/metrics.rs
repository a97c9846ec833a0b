use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("contact_requests_total", "Contact submissions admitted by the rate limiter").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("contact_rate_limited_total", "Submissions rejected by the rate limiter").unwrap();
    pub static ref EMAILS_SENT: Counter =
        register_counter!("contact_emails_sent_total", "Emails accepted by the provider").unwrap();
    pub static ref EMAIL_FAILURES: Counter =
        register_counter!("contact_email_failures_total", "Emails the provider failed to accept").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "contact_request_latency_seconds",
        "Contact submission latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("contact_tracked_clients", "Clients currently held by the rate limiter").unwrap();
}

// Render every registered metric in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
