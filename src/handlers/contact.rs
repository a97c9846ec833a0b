use axum::{Json, extract::State, extract::rejection::JsonRejection};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::email::OutgoingEmail;
use crate::error::{AppError, Result};
use crate::metrics::{EMAIL_FAILURES, EMAILS_SENT, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ContactRequest, ContactResponse};
use crate::state::AppState;
use crate::template;
use crate::validation::ContactSubmission;

// Relay a contact form submission to the recipient by email.
// Only reached once the rate limiting stage has admitted the request.
pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let Some(mailer) = state.mailer.as_ref() else {
        error!("RESEND_API_KEY is not set");
        return Err(AppError::Configuration);
    };

    let Json(payload) = payload.map_err(|rejection| {
        debug!(%rejection, "unreadable contact payload");
        AppError::BadRequest("Invalid data format".to_string())
    })?;

    let submission = ContactSubmission::from_request(payload)?;
    info!(request = %submission.redacted(), "Contact submission received");

    let email = OutgoingEmail {
        from: state.sender.clone(),
        to: vec![submission.recipient_email.clone()],
        subject: template::subject(&submission),
        html: template::render(&submission),
    };

    let id = match mailer.send(&email).await {
        Ok(id) => {
            EMAILS_SENT.inc();
            id
        }
        Err(e) => {
            EMAIL_FAILURES.inc();
            error!(error = %e, "Failed to send email");
            return Err(e.into());
        }
    };

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    info!(%id, "Email sent");

    Ok(Json(ContactResponse {
        success: true,
        message: "Email sent successfully".to_string(),
        id,
    }))
}
