//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an amount fits the two-decimal money scale
pub fn validate_amount_precision(amount: &BigDecimal) -> LedgerResult<()> {
    let (_, scale) = amount.normalized().as_bigint_and_exponent();
    if scale > MONEY_SCALE {
        return Err(LedgerError::Validation(
            "amount must have at most two decimal places".to_string(),
        ));
    }
    Ok(())
}

/// Validate a deposit or transfer amount and bring it to the money scale
pub fn normalize_amount(amount: &BigDecimal) -> LedgerResult<BigDecimal> {
    validate_positive_amount(amount)?;
    validate_amount_precision(amount)?;
    Ok(amount.with_scale(MONEY_SCALE))
}

/// Validate a display name, returning it trimmed
pub fn validate_display_name(name: &str) -> LedgerResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(
            "display name is required".to_string(),
        ));
    }

    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(LedgerError::Validation(format!(
            "display name cannot exceed {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }

    Ok(trimmed)
}
