use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::rate_limit::ClientRegistry;

// key for requests with no resolvable source address
pub const UNKNOWN_CLIENT: &str = "unknown";

// loopback and docker bridge
pub const DEFAULT_EXEMPT_CLIENTS: [&str; 3] = ["127.0.0.1", "::1", "172.17.0.1"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePolicy {
    pub name: String,
    pub max_requests: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub fn new(name: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_requests,
            window,
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

#[derive(Debug, Clone)]
pub struct ExemptList {
    clients: HashSet<String>,
}

impl ExemptList {
    pub fn new<I, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clients: clients
                .into_iter()
                .map(|c| {
                    let c: String = c.into();
                    c.trim().to_string()
                })
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            clients: HashSet::new(),
        }
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ExemptList {
    fn default() -> Self {
        Self::new(DEFAULT_EXEMPT_CLIENTS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    // store not consulted
    Exempt,
    Admitted,
    Limited {
        max_requests: u32,
        window: Duration,
    },
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Verdict::Limited { .. })
    }
}

// One guard per protected route; guards may share a registry
#[derive(Clone)]
pub struct AdmissionGuard {
    registry: Arc<ClientRegistry>,
    policy: RatePolicy,
    exempt: Arc<ExemptList>,
}

impl AdmissionGuard {
    pub fn new(registry: Arc<ClientRegistry>, policy: RatePolicy, exempt: Arc<ExemptList>) -> Self {
        Self {
            registry,
            policy,
            exempt,
        }
    }

    pub fn check(&self, client_id: Option<&str>) -> Verdict {
        self.check_at(client_id, Instant::now())
    }

    pub fn check_at(&self, client_id: Option<&str>, now: Instant) -> Verdict {
        let client_id = client_id.unwrap_or(UNKNOWN_CLIENT);

        if self.exempt.contains(client_id) {
            trace!(client = %client_id, policy = %self.policy.name, "exempt client");
            return Verdict::Exempt;
        }

        let limited = self.registry.record_and_check_at(
            client_id,
            self.policy.max_requests,
            self.policy.window,
            now,
        );

        if limited {
            debug!(
                client = %client_id,
                policy = %self.policy.name,
                max_requests = self.policy.max_requests,
                window_secs = self.policy.window_secs(),
                "policy exceeded"
            );
            Verdict::Limited {
                max_requests: self.policy.max_requests,
                window: self.policy.window,
            }
        } else {
            Verdict::Admitted
        }
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }
}
