use std::sync::Arc;

use crate::email::EmailSender;

// app's shared state
pub struct AppState {
    pub mailer: Option<Arc<dyn EmailSender>>, // None when no provider key is configured
    pub sender: String,                       // "Contact Form <address>"
}
