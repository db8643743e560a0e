//! Checkout form validation.
//!
//! A checkout arrives as loosely typed form data from the front-desk app.
//! [`CheckoutInput::validate`] turns it into a [`NewCheckout`] that is safe to
//! append to the ledger, or reports the first rule it breaks.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::checkin_date::normalize_checkin_date;
use super::phone::CanonicalPhone;

/// Longest accepted first or last name, in characters.
pub const MAX_NAME_CHARS: usize = 120;

/// Longest accepted booking reference, in characters.
pub const MAX_BOOKING_ID_CHARS: usize = 80;

/// Upper bound for both the checkout amount and spent bonus points.
pub const MAX_AMOUNT: i64 = 1_000_000;

/// Reasons a checkout form is rejected.
///
/// Messages are safe to show to front-desk staff.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("phone, last name, first name, booking id and amount are required")]
    MissingRequiredFields,

    #[error("guest phone number must contain at least 10 digits")]
    InvalidPhone,

    #[error("first and last name cannot be blank")]
    BlankName,

    #[error("first and last name must be at most 120 characters")]
    NameTooLong,

    #[error("booking id cannot be blank")]
    BlankBookingId,

    #[error("booking id must be at most 80 characters")]
    BookingIdTooLong,

    #[error("check-in date must be a valid date in YYYY-MM-DD, DD.MM.YYYY, DD-MM-YYYY or YYYY.MM.DD format")]
    InvalidCheckinDate,

    #[error("checkout amount must be a positive number no greater than 1 000 000")]
    InvalidAmount,

    #[error("spent bonus points cannot exceed 1 000 000")]
    BonusTooLarge,
}

/// Raw checkout fields as received from a client.
///
/// Every field is optional text so that presence, trimming and number parsing
/// are all decided here rather than by the deserializer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutInput {
    pub guest_phone: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub checkin_date: Option<String>,
    pub loyalty_level: Option<String>,
    pub booking_id: Option<String>,
    pub total_amount: Option<String>,
    pub bonus_spent: Option<String>,
}

/// A validated checkout, ready to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCheckout {
    pub guest_phone: CanonicalPhone,
    pub last_name: String,
    pub first_name: String,
    pub checkin_date: NaiveDate,
    pub loyalty_level: Option<String>,
    pub booking_id: String,
    pub total_amount: Decimal,
    pub bonus_spent: i32,
}

impl CheckoutInput {
    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns the first [`CheckoutError`] the input violates, checking in
    /// this order: required fields, phone, names, booking id, check-in date,
    /// amount, bonus points.
    pub fn validate(&self) -> Result<NewCheckout, CheckoutError> {
        let (Some(phone), Some(last_name), Some(first_name), Some(booking_id), Some(amount)) = (
            present(self.guest_phone.as_deref()),
            present(self.last_name.as_deref()),
            present(self.first_name.as_deref()),
            present(self.booking_id.as_deref()),
            present(self.total_amount.as_deref()),
        ) else {
            return Err(CheckoutError::MissingRequiredFields);
        };

        let guest_phone =
            CanonicalPhone::parse(phone).map_err(|_| CheckoutError::InvalidPhone)?;

        let last_name = last_name.trim();
        let first_name = first_name.trim();
        if last_name.is_empty() || first_name.is_empty() {
            return Err(CheckoutError::BlankName);
        }
        if last_name.chars().count() > MAX_NAME_CHARS
            || first_name.chars().count() > MAX_NAME_CHARS
        {
            return Err(CheckoutError::NameTooLong);
        }

        let booking_id = booking_id.trim();
        if booking_id.is_empty() {
            return Err(CheckoutError::BlankBookingId);
        }
        if booking_id.chars().count() > MAX_BOOKING_ID_CHARS {
            return Err(CheckoutError::BookingIdTooLong);
        }

        let checkin_date = self
            .checkin_date
            .as_deref()
            .and_then(normalize_checkin_date)
            .ok_or(CheckoutError::InvalidCheckinDate)?;

        let total_amount = parse_amount(amount).ok_or(CheckoutError::InvalidAmount)?;

        let bonus_spent = self.bonus_spent.as_deref().map_or(0, parse_bonus);
        if i64::from(bonus_spent) > MAX_AMOUNT {
            return Err(CheckoutError::BonusTooLarge);
        }

        let loyalty_level = self
            .loyalty_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .map(str::to_owned);

        Ok(NewCheckout {
            guest_phone,
            last_name: last_name.to_owned(),
            first_name: first_name.to_owned(),
            checkin_date,
            loyalty_level,
            booking_id: booking_id.to_owned(),
            total_amount,
            bonus_spent,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse a decimal amount in `(0, MAX_AMOUNT]`.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let amount = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()?;

    (amount > Decimal::ZERO && amount <= Decimal::from(MAX_AMOUNT)).then_some(amount)
}

/// Parse spent bonus points. Garbage and negative values count as zero; the
/// fractional part is dropped. Values beyond `i32` saturate so the upper-bound
/// check still fires.
fn parse_bonus(raw: &str) -> i32 {
    let raw = raw.trim();
    let whole = raw.parse::<i64>().ok().or_else(|| {
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
            .and_then(|d| d.trunc().to_i64())
    });

    match whole {
        Some(n) if n > 0 => i32::try_from(n).unwrap_or(i32::MAX),
        _ => 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> CheckoutInput {
        CheckoutInput {
            guest_phone: Some("+7 (999) 123-45-67".to_string()),
            last_name: Some("  Иванов ".to_string()),
            first_name: Some("Иван".to_string()),
            checkin_date: Some("05.01.2024".to_string()),
            loyalty_level: Some(" 2 СЕЗОНА ".to_string()),
            booking_id: Some("SH-1001".to_string()),
            total_amount: Some("15000.50".to_string()),
            bonus_spent: Some("300".to_string()),
        }
    }

    fn with_amount(amount: &str) -> CheckoutInput {
        CheckoutInput {
            total_amount: Some(amount.to_string()),
            ..valid_input()
        }
    }

    #[test]
    fn test_valid_input_is_normalized() {
        let checkout = valid_input().validate().unwrap();
        assert_eq!(checkout.guest_phone.as_str(), "9991234567");
        assert_eq!(checkout.last_name, "Иванов");
        assert_eq!(checkout.checkin_date.to_string(), "2024-01-05");
        assert_eq!(checkout.loyalty_level.as_deref(), Some("2 СЕЗОНА"));
        assert_eq!(checkout.total_amount, Decimal::from_str("15000.50").unwrap());
        assert_eq!(checkout.bonus_spent, 300);
    }

    #[test]
    fn test_missing_required_fields() {
        for input in [
            CheckoutInput { guest_phone: None, ..valid_input() },
            CheckoutInput { last_name: Some(String::new()), ..valid_input() },
            CheckoutInput { first_name: None, ..valid_input() },
            CheckoutInput { booking_id: None, ..valid_input() },
            CheckoutInput { total_amount: None, ..valid_input() },
        ] {
            assert_eq!(input.validate(), Err(CheckoutError::MissingRequiredFields));
        }
    }

    #[test]
    fn test_short_phone_is_rejected() {
        let input = CheckoutInput {
            guest_phone: Some("123-45".to_string()),
            ..valid_input()
        };
        assert_eq!(input.validate(), Err(CheckoutError::InvalidPhone));
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let input = CheckoutInput {
            first_name: Some("   ".to_string()),
            ..valid_input()
        };
        assert_eq!(input.validate(), Err(CheckoutError::BlankName));
    }

    #[test]
    fn test_name_length_is_counted_in_characters() {
        let at_limit = CheckoutInput {
            last_name: Some("Я".repeat(MAX_NAME_CHARS)),
            ..valid_input()
        };
        assert!(at_limit.validate().is_ok());

        let over = CheckoutInput {
            last_name: Some("Я".repeat(MAX_NAME_CHARS + 1)),
            ..valid_input()
        };
        assert_eq!(over.validate(), Err(CheckoutError::NameTooLong));
    }

    #[test]
    fn test_booking_id_bounds() {
        let at_limit = CheckoutInput {
            booking_id: Some("B".repeat(80)),
            ..valid_input()
        };
        assert!(at_limit.validate().is_ok());

        let over = CheckoutInput {
            booking_id: Some("B".repeat(81)),
            ..valid_input()
        };
        assert_eq!(over.validate(), Err(CheckoutError::BookingIdTooLong));

        let blank = CheckoutInput {
            booking_id: Some("  ".to_string()),
            ..valid_input()
        };
        assert_eq!(blank.validate(), Err(CheckoutError::BlankBookingId));
    }

    #[test]
    fn test_checkin_date_must_be_real() {
        let input = CheckoutInput {
            checkin_date: Some("13-13-2024".to_string()),
            ..valid_input()
        };
        assert_eq!(input.validate(), Err(CheckoutError::InvalidCheckinDate));

        let missing = CheckoutInput {
            checkin_date: None,
            ..valid_input()
        };
        assert_eq!(missing.validate(), Err(CheckoutError::InvalidCheckinDate));
    }

    #[test]
    fn test_amount_bounds() {
        assert_eq!(with_amount("0").validate(), Err(CheckoutError::InvalidAmount));
        assert_eq!(with_amount("-5").validate(), Err(CheckoutError::InvalidAmount));
        assert_eq!(
            with_amount("1000001").validate(),
            Err(CheckoutError::InvalidAmount)
        );
        assert_eq!(with_amount("abc").validate(), Err(CheckoutError::InvalidAmount));

        assert_eq!(with_amount("1").validate().unwrap().total_amount, Decimal::ONE);
        assert_eq!(
            with_amount("1000000").validate().unwrap().total_amount,
            Decimal::from(MAX_AMOUNT)
        );
    }

    #[test]
    fn test_bonus_parsing() {
        let bonus = |raw: Option<&str>| {
            CheckoutInput {
                bonus_spent: raw.map(str::to_string),
                ..valid_input()
            }
            .validate()
            .map(|c| c.bonus_spent)
        };

        assert_eq!(bonus(None), Ok(0));
        assert_eq!(bonus(Some("")), Ok(0));
        assert_eq!(bonus(Some("not a number")), Ok(0));
        assert_eq!(bonus(Some("-50")), Ok(0));
        assert_eq!(bonus(Some("12.9")), Ok(12));
        assert_eq!(bonus(Some("1000000")), Ok(1_000_000));
        assert_eq!(bonus(Some("1000001")), Err(CheckoutError::BonusTooLarge));
        assert_eq!(bonus(Some("99999999999")), Err(CheckoutError::BonusTooLarge));
    }

    #[test]
    fn test_blank_loyalty_level_becomes_none() {
        let input = CheckoutInput {
            loyalty_level: Some("   ".to_string()),
            ..valid_input()
        };
        assert_eq!(input.validate().unwrap().loyalty_level, None);
    }
}
