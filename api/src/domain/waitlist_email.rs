use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

/// An address that passed the landing page's format check.
///
/// The value is stored exactly as submitted: no trimming and no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WaitlistEmail(String);

impl WaitlistEmail {
    pub fn parse(s: String) -> Result<WaitlistEmail, String> {
        if s.is_empty() {
            return Err("Email is required".to_string());
        }

        if has_valid_format(&s) {
            Ok(Self(s))
        } else {
            Err("Invalid email format".to_string())
        }
    }

    pub fn inner(&self) -> &str {
        self.0.as_str()
    }
}

// `\s` in regex-lite is ASCII only, so Unicode spaces and the byte order mark
// are listed explicitly.
const WHITESPACE: &str =
    "\\s\u{00A0}\u{1680}\u{2000}-\u{200A}\u{2028}\u{2029}\u{202F}\u{205F}\u{3000}\u{FEFF}";

static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    let part = format!("[^@{}]+", WHITESPACE);
    Regex::new(&format!("^{part}@{part}\\.{part}$", part = part))
        .expect("The email format pattern is a valid regex")
});

fn has_valid_format(s: &str) -> bool {
    EMAIL_FORMAT.is_match(s)
}

impl AsRef<str> for WaitlistEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WaitlistEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
