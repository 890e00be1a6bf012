use lx_core::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 2;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 10;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

/// Trims and drops angle brackets.
pub fn sanitize(input: &str) -> String {
    input.trim().replace(['<', '>'], "")
}

/// Non-empty string field of a JSON body.
pub fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::validation("VALIDATION_ERROR", format!("Missing or invalid required field: {}", field)))
}

pub fn email(raw: &str) -> Result<String> {
    let email = sanitize(raw).to_lowercase();
    if !email_regex().is_match(&email) {
        return Err(Error::validation("INVALID_EMAIL", "Invalid email format"));
    }
    Ok(email)
}

pub fn password(raw: &str) -> Result<&str> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "WEAK_PASSWORD",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(raw)
}

pub fn username(raw: &str) -> Result<String> {
    let username = sanitize(raw);
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(Error::validation(
            "INVALID_USERNAME",
            format!("Username must be at least {} characters", MIN_USERNAME_LEN),
        ));
    }
    Ok(username)
}

/// `pageSize` query value, defaulting to 10 and bounded to 1..=100.
pub fn page_size(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PAGE_SIZE);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
        _ => Err(Error::validation(
            "VALIDATION_ERROR",
            format!("Page size must be between 1 and {}", MAX_PAGE_SIZE),
        )),
    }
}
