use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::ContactRequest;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid sender email format")]
    InvalidSenderEmail,

    #[error("Invalid recipient email format")]
    InvalidRecipientEmail,
}

// Submission that passed validation; text fields are kept verbatim and only
// escaped when the email is rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    pub recipient_email: String,
    pub phone: Option<String>,
}

impl ContactSubmission {
    pub fn from_request(req: ContactRequest) -> Result<Self, ValidationError> {
        let name = required(req.name, "name")?;
        let email = required(req.email, "email")?;
        let message = required(req.message, "message")?;
        let recipient_email = required(req.recipient_email, "recipient_email")?;

        if !is_valid_email(&email) {
            debug!("sender email rejected");
            return Err(ValidationError::InvalidSenderEmail);
        }
        if !is_valid_email(&recipient_email) {
            debug!("recipient email rejected");
            return Err(ValidationError::InvalidRecipientEmail);
        }

        Ok(Self {
            name,
            email,
            message,
            recipient_email,
            phone: req.phone.filter(|p| !p.trim().is_empty()),
        })
    }

    // loggable view with the sender address and message body shortened
    pub fn redacted(&self) -> serde_json::Value {
        let email_prefix: String = self.email.chars().take(3).collect();
        let message = if self.message.chars().count() > 20 {
            format!("{}...", self.message.chars().take(20).collect::<String>())
        } else {
            self.message.clone()
        };

        json!({
            "name": self.name,
            "email": format!("{email_prefix}...@redacted"),
            "message": message,
            "recipient_email": self.recipient_email,
            "phone": self.phone,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

// local@domain.tld: local part [A-Za-z0-9._%+-]+, domain [A-Za-z0-9.-]+,
// last label at least two ASCII letters
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}
