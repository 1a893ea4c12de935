//! Input shape validation: email, password policy, OTP codes.
//!
//! Pure functions — no I/O. The password policy collects every failing
//! rule so callers can present all of them at once.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

static OTP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("otp regex"));

const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A 6-digit numeric one-time code.
pub fn valid_otp(code: &str) -> bool {
    OTP_RE.is_match(code)
}

/// Returns every password-policy rule the candidate fails, in a fixed order.
/// An empty vec means the password is acceptable.
pub fn password_violations(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();
    if password.len() < 8 {
        errors.push("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        errors.push("Password must contain at least one special character");
    }
    errors
}

pub fn valid_password(password: &str) -> bool {
    password_violations(password).is_empty()
}
