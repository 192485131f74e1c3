// src/validators.rs
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

pub fn valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}
