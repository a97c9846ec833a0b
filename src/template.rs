use crate::validation::ContactSubmission;

const STYLE: &str = r#"
        body { font-family: 'Roboto', sans-serif; margin: 0; padding: 0; background-color: #ffffff; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; background-color: #ffffff; border-radius: 8px; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1); }
        .header { padding: 20px; background-color: #4F46E5; color: white; border-radius: 8px 8px 0 0; text-align: center; }
        .content { padding: 30px; }
        .field { margin-bottom: 20px; }
        .label { font-weight: 700; color: #4F46E5; margin-bottom: 5px; display: block; }
        .value { font-size: 16px; line-height: 1.6; color: #333; }
        .message-box { background-color: #f3f4f6; border-left: 4px solid #4F46E5; padding: 15px; border-radius: 4px; }
        .footer { text-align: center; margin-top: 30px; color: #6b7280; font-size: 14px; }
"#;

// Escape text for inclusion in HTML element content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn field(label: &str, value: &str) -> String {
    format!(
        r#"
            <div class="field">
                <div class="label">{label}</div>
                <div class="value">{value}</div>
            </div>"#
    )
}

pub fn subject(submission: &ContactSubmission) -> String {
    format!("New contact form submission from {}", submission.name)
}

// Render the notification email sent to the form owner
pub fn render(submission: &ContactSubmission) -> String {
    let phone = submission
        .phone
        .as_deref()
        .map(|p| field("Phone", &escape_html(p)))
        .unwrap_or_default();
    let message = escape_html(&submission.message).replace('\n', "<br>");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Contact Form Submission</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1 style="margin: 0;">New Contact Form Submission</h1>
        </div>
        <div class="content">{name}{email}{phone}
            <div class="field">
                <div class="label">Message</div>
                <div class="value message-box">{message}</div>
            </div>
        </div>
        <div class="footer">
            <p>This email was sent automatically from your contact form.</p>
        </div>
    </div>
</body>
</html>
"#,
        name = field("Name", &escape_html(&submission.name)),
        email = field("Email", &escape_html(&submission.email)),
    )
}
