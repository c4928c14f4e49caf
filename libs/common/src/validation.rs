//! Input validation utilities
//!
//! The same rules run on the server before any handler logic and in the
//! client forms, so the messages live here too.

use regex::Regex;
use std::sync::OnceLock;

pub const MISSING_CREDENTIALS: &str = "Missing credentials";
pub const INVALID_NAME: &str = "Invalid name";
pub const INVALID_EMAIL_ADDRESS: &str = "Invalid email address";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const PASSWORD_MISMATCH: &str = "Confirm password does not match with password";

/// Characters that count as "special" in a password
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*-_.?";

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 50;

/// Letters, optionally separated by `. `, `, `, `-`, `'` or a single space
pub fn is_name_valid(name: &str) -> bool {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z]+([.,] |[-']| )?)+[A-Za-z]+\.?\s*$")
            .expect("Failed to compile name regex")
    });

    regex.is_match(name)
}

pub fn is_email_address_valid(email_address: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("Failed to compile email regex")
    });

    regex.is_match(email_address)
}

/// Line terminators are never part of a password
const PASSWORD_FORBIDDEN: [char; 4] = ['\n', '\r', '\u{2028}', '\u{2029}'];

/// 8 to 50 characters with a digit, an upper and a lower case letter and
/// one of [`PASSWORD_SPECIALS`]
pub fn is_password_valid(password: &str) -> bool {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
        || password.contains(PASSWORD_FORBIDDEN)
    {
        return false;
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if PASSWORD_SPECIALS.contains(c) {
            has_special = true;
        }
    }

    has_upper && has_lower && has_digit && has_special
}

/// Validate a name, returning the user-facing message on failure
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if is_name_valid(name) {
        Ok(())
    } else {
        Err(INVALID_NAME)
    }
}

pub fn validate_email_address(email_address: &str) -> Result<(), &'static str> {
    if is_email_address_valid(email_address) {
        Ok(())
    } else {
        Err(INVALID_EMAIL_ADDRESS)
    }
}

/// Validate a password and its confirmation
pub fn validate_password_pair(password: &str, confirm_password: &str) -> Result<(), &'static str> {
    if !is_password_valid(password) {
        return Err(INVALID_PASSWORD);
    }
    if password != confirm_password {
        return Err(PASSWORD_MISMATCH);
    }
    Ok(())
}
