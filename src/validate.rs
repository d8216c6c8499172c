use url::Url;

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "data:", "vbscript:"];
const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

pub const INVALID_URL_MESSAGE: &str = "Please enter a valid URL (e.g., https://example.com)";
pub const SCHEME_NOT_ALLOWED_MESSAGE: &str = "Only HTTP/HTTPS URLs are allowed";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub accepted: bool,
    /// Empty when accepted, and also for empty input ("nothing to validate yet").
    pub reason: String,
}

impl ValidationResult {
    fn accept() -> Self {
        Self {
            accepted: true,
            reason: String::new(),
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }

    /// True for the "no input yet" result, which is not an error.
    pub fn is_empty_input(&self) -> bool {
        !self.accepted && self.reason.is_empty()
    }
}

/// Classify a candidate URL for QR encoding. Cheap enough for every keystroke.
pub fn validate(url: &str) -> ValidationResult {
    let url = url.trim();
    if url.is_empty() {
        return ValidationResult::default();
    }

    let lowered = url.to_ascii_lowercase();
    if let Some(scheme) = BLOCKED_SCHEMES.iter().find(|s| lowered.starts_with(*s)) {
        let name = scheme.trim_end_matches(':');
        return ValidationResult::reject(format!("{name}: URLs are not allowed"));
    }

    let Ok(parsed) = Url::parse(url) else {
        return ValidationResult::reject(INVALID_URL_MESSAGE);
    };

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return ValidationResult::reject(SCHEME_NOT_ALLOWED_MESSAGE);
    }

    ValidationResult::accept()
}
