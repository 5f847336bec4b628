use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::InstallmentSettings;
use crate::core::{AppError, Result};

/// Result of splitting one line item into a down payment plus equal installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentBreakdown {
    /// `current_price * quantity`, charged at checkout
    pub down_payment: Decimal,
    /// `round((full_amount - current_price) * quantity, 2)`
    pub remaining_amount: Decimal,
    /// `round(remaining_amount / installment_count, 2)`
    pub installment_amount: Decimal,
    pub installment_count: u32,
}

impl InstallmentBreakdown {
    /// Total of the scheduled installments. May differ from
    /// `remaining_amount` by up to `installment_count` cents.
    pub fn scheduled_total(&self) -> Decimal {
        self.installment_amount * Decimal::from(self.installment_count)
    }

    /// `down_payment + remaining_amount`
    pub fn total_amount(&self) -> Decimal {
        self.down_payment + self.remaining_amount
    }
}

/// Half-up rounding to cents
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Lenient numeric coercion for host-provided values: the leading decimal
/// number is used ("12.5 KWD" is 12.5), anything without one is zero.
pub fn coerce_decimal(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    let mut seen_point = false;
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| match c {
            '0'..='9' => true,
            '-' | '+' => *i == 0,
            '.' if !seen_point => {
                seen_point = true;
                true
            }
            _ => false,
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);

    Decimal::from_str(trimmed[..end].trim_end_matches('.')).unwrap_or(Decimal::ZERO)
}

/// Lenient integer coercion: leading digits only, anything else is zero.
pub fn coerce_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    let digits: String = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect();
    digits.parse().unwrap_or(0)
}

/// Calculator for installment breakdowns
///
/// Every call site (product preview, checkout, plan creation) goes through
/// [`InstallmentCalculator::calculate`].
pub struct InstallmentCalculator;

impl InstallmentCalculator {
    /// Split a line item into a down payment and equal monthly installments
    ///
    /// # Arguments
    /// * `current_price` - Unit price charged today
    /// * `full_amount` - Unit price paid over the whole plan
    /// * `installment_count` - Number of monthly installments
    /// * `quantity` - Line quantity
    ///
    /// # Returns
    /// The breakdown, or `AppError::Validation` when the inputs cannot form a plan
    pub fn calculate(
        current_price: Decimal,
        full_amount: Decimal,
        installment_count: i64,
        quantity: i64,
    ) -> Result<InstallmentBreakdown> {
        if full_amount <= Decimal::ZERO {
            return Err(AppError::validation("Full amount must be greater than zero"));
        }
        if current_price <= Decimal::ZERO {
            return Err(AppError::validation("Current price must be greater than zero"));
        }
        if installment_count < 2 {
            return Err(AppError::validation(format!(
                "Installment count must be at least 2, got {}",
                installment_count
            )));
        }
        if full_amount <= current_price {
            return Err(AppError::validation(format!(
                "Full amount ({}) must exceed current price ({})",
                full_amount, current_price
            )));
        }
        if quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than zero"));
        }

        let installment_count = u32::try_from(installment_count)
            .map_err(|_| AppError::validation("Installment count out of range"))?;
        let qty = Decimal::from(quantity);

        let remaining_amount = round_half_up((full_amount - current_price) * qty);
        let installment_amount = round_half_up(remaining_amount / Decimal::from(installment_count));

        Ok(InstallmentBreakdown {
            down_payment: current_price * qty,
            remaining_amount,
            installment_amount,
            installment_count,
        })
    }

    /// Same as [`calculate`](Self::calculate) for raw host values (meta fields, form input)
    pub fn calculate_raw(
        current_price: &str,
        full_amount: &str,
        installment_count: &str,
        quantity: &str,
    ) -> Result<InstallmentBreakdown> {
        Self::calculate(
            coerce_decimal(current_price),
            coerce_decimal(full_amount),
            coerce_count(installment_count),
            coerce_count(quantity),
        )
    }

    /// Merchant limits on top of the calculator's own validity rules
    pub fn check_limits(
        breakdown: &InstallmentBreakdown,
        settings: &InstallmentSettings,
    ) -> Result<()> {
        if breakdown.installment_count > settings.max_count {
            return Err(AppError::validation(format!(
                "Installment count {} exceeds the maximum of {}",
                breakdown.installment_count, settings.max_count
            )));
        }
        if breakdown.installment_amount < settings.min_installment_amount {
            return Err(AppError::validation(format!(
                "Installment amount {} is below the minimum of {}",
                breakdown.installment_amount, settings.min_installment_amount
            )));
        }
        Ok(())
    }
}
