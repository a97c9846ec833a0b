use clap::Parser;
use std::time::Duration;

use crate::admission::{ExemptList, RatePolicy};
use crate::email::DEFAULT_RESEND_API_URL;
use crate::rate_limit::ClientRegistry;

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "contact-gateway")]
#[command(about = "Rate limited contact form relay")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 5000)]
    pub port: u16,

    // Contact submissions allowed per window, per client
    #[arg(long, env = "RATE_LIMIT", default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Minimum seconds between idle-client sweeps
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 3600)]
    pub cleanup_interval: u64,

    // Seconds without a request before a client is forgotten
    #[arg(long, env = "IDLE_TTL", default_value_t = 86_400)]
    pub idle_ttl: u64,

    // Client addresses never rate limited (comma-separated)
    #[arg(
        long,
        env = "EXEMPT_CLIENTS",
        value_delimiter = ',',
        default_value = "127.0.0.1,::1,172.17.0.1"
    )]
    pub exempt_clients: Vec<String>,

    // Take the client address from X-Forwarded-For (one proxy hop)
    #[arg(long, env = "TRUST_PROXY", default_value_t = false)]
    pub trust_proxy: bool,

    // Allowed CORS origins (comma-separated, "*" for any)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    // Resend API key; contact submissions fail with 500 when unset
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    // Resend API base url
    #[arg(long, env = "RESEND_API_URL", default_value = DEFAULT_RESEND_API_URL)]
    pub resend_api_url: String,

    // Address the notification emails are sent from
    #[arg(long, env = "SENDER_EMAIL")]
    pub sender_email: Option<String>,

    // Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        // bracket bare IPv6 hosts
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn contact_policy(&self) -> RatePolicy {
        RatePolicy::new("contact", self.rate_limit, Duration::from_secs(self.rate_window))
    }

    pub fn exempt_list(&self) -> ExemptList {
        ExemptList::new(self.exempt_clients.iter().cloned())
    }

    pub fn client_registry(&self) -> ClientRegistry {
        ClientRegistry::new(
            Duration::from_secs(self.cleanup_interval),
            Duration::from_secs(self.idle_ttl),
        )
    }

    pub fn sender_address(&self) -> String {
        format!(
            "Contact Form <{}>",
            self.sender_email.as_deref().unwrap_or_default()
        )
    }
}
