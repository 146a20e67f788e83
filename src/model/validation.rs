use regex::Regex;
use rust_decimal::Decimal;
use lazy_static::lazy_static;
use crate::utils::errors::{ErrorCode, TurnstileError};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

lazy_static! {
    // ASCII digits only, 10 to 15 of them.
    static ref PHONE_REGEX: Regex = Regex::new(r"^[0-9]{10,15}$")
        .expect("Invalid phone pattern");

    static ref EMAIL_REGEX: Regex = Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$")
        .expect("Invalid email pattern");
}

pub fn validate_name(name: &str) -> Result<(), TurnstileError> {
    if name.trim().is_empty() {
        return Err(ErrorCode::InvalidName.with_msg("a name is required"))
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), TurnstileError> {
    if !PHONE_REGEX.is_match(phone) {
        return Err(ErrorCode::InvalidPhone.with_msg("a phone number must be 10 to 15 digits"))
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), TurnstileError> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(ErrorCode::InvalidEmail.with_msg("the email address is not valid"))
    }

    Ok(())
}

///
/// Length is counted in characters, not bytes.
///
pub fn validate_password(plain_text_password: &str) -> Result<(), TurnstileError> {
    let length = plain_text_password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ErrorCode::PasswordTooShort
            .with_msg(&format!("passwords must be at least {} characters", MIN_PASSWORD_LENGTH)))
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(ErrorCode::PasswordTooLong
            .with_msg(&format!("passwords may not be more than {} characters", MAX_PASSWORD_LENGTH)))
    }

    Ok(())
}

///
/// Credit and debit deltas must not be negative.
///
pub fn validate_amount(amount: Decimal) -> Result<(), TurnstileError> {
    if amount < Decimal::ZERO {
        return Err(ErrorCode::NegativeAmount.with_msg(&format!("the amount {} is negative", amount)))
    }

    Ok(())
}

pub fn validate_balance(balance: Decimal) -> Result<(), TurnstileError> {
    if balance < Decimal::ZERO {
        return Err(ErrorCode::InvalidBalance.with_msg(&format!("a balance of {} is negative", balance)))
    }

    Ok(())
}
