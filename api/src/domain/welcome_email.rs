use crate::domain::waitlist_email::WaitlistEmail;

pub const WELCOME_EMAIL_SUBJECT: &str = "🎉 Thank You for Joining PushToPost!";

const WELCOME_EMAIL_TEMPLATE: &str = include_str!("../../templates/welcome_email.html");
const RECIPIENT_PLACEHOLDER: &str = "{{recipient}}";

pub fn render_welcome_email(recipient: &WaitlistEmail) -> String {
    WELCOME_EMAIL_TEMPLATE.replace(RECIPIENT_PLACEHOLDER, &escape_html(recipient.as_ref()))
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
