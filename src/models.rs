use serde::{Deserialize, Serialize};

// Contact form submission; every field is optional so missing ones can be
// reported by name instead of failing deserialization
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub recipient_email: Option<String>,
    pub phone: Option<String>,
}

// Successful submission
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    pub id: String,
}

// Body of every error response
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ErrorBody {
    pub error: String,
}

// Body of a 429 from the rate limiter
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RateLimitBody {
    pub error: String,
    pub message: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}
