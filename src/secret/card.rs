//! Payment-card field rules: number checksum, expiry and CV.

use chrono::NaiveDate;

use crate::errors::{KeeperError, Result};

/// Number of digits in a supported card number.
const CARD_NUMBER_LEN: usize = 16;

/// Returns true if `number` is exactly 16 ASCII digits and passes the
/// Luhn checksum.
pub fn is_valid_card_number(number: &str) -> bool {
    number.len() == CARD_NUMBER_LEN
        && number.bytes().all(|b| b.is_ascii_digit())
        && luhn_checksum(number) % 10 == 0
}

/// Luhn sum over a string of ASCII digits, doubling every second digit
/// counted from the right.
fn luhn_checksum(digits: &str) -> u32 {
    digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum()
}

/// Parse a card number, validating length and checksum.
pub fn parse_card_number(input: &str) -> Result<u64> {
    if !is_valid_card_number(input) {
        return Err(KeeperError::InvalidCardNumber);
    }
    input.parse().map_err(|_| KeeperError::InvalidCardNumber)
}

/// Parse an expiration date written as `MM/YY` into the first day of
/// that month. Two-digit years land in 2000..=2099.
pub fn parse_expiry(input: &str) -> Result<NaiveDate> {
    let (month, year) = input.split_once('/').ok_or(KeeperError::InvalidCardDate)?;
    if month.len() != 2 || year.len() != 2 {
        return Err(KeeperError::InvalidCardDate);
    }
    if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(KeeperError::InvalidCardDate);
    }

    let month: u32 = month.parse().map_err(|_| KeeperError::InvalidCardDate)?;
    let year: i32 = year.parse().map_err(|_| KeeperError::InvalidCardDate)?;

    NaiveDate::from_ymd_opt(2000 + year, month, 1).ok_or(KeeperError::InvalidCardDate)
}

/// Parse a card verification value: an integer in `100..=999`.
pub fn parse_cv(input: &str) -> Result<u16> {
    let cv: u16 = input.parse().map_err(|_| KeeperError::InvalidCardCv)?;
    if (100..=999).contains(&cv) {
        Ok(cv)
    } else {
        Err(KeeperError::InvalidCardCv)
    }
}
