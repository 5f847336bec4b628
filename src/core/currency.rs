use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies accepted by the Tap payment API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Kuwaiti Dinar (3 decimal places)
    KWD,
    /// Saudi Riyal
    SAR,
    /// UAE Dirham
    AED,
    /// Bahraini Dinar (3 decimal places)
    BHD,
    /// Egyptian Pound
    EGP,
    EUR,
    GBP,
    /// Qatari Riyal
    QAR,
    USD,
    /// Omani Rial (3 decimal places)
    OMR,
    /// Jordanian Dinar (3 decimal places)
    JOD,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::KWD,
        Currency::SAR,
        Currency::AED,
        Currency::BHD,
        Currency::EGP,
        Currency::EUR,
        Currency::GBP,
        Currency::QAR,
        Currency::USD,
        Currency::OMR,
        Currency::JOD,
    ];

    /// Number of minor-unit digits
    /// - KWD/BHD/OMR/JOD: 3
    /// - everything else: 2
    pub fn scale(&self) -> u32 {
        match self {
            Currency::KWD | Currency::BHD | Currency::OMR | Currency::JOD => 3,
            _ => 2,
        }
    }

    /// Multiplier between a major-unit amount and the API's smallest unit
    pub fn multiplier(&self) -> Decimal {
        Decimal::from(10_i64.pow(self.scale()))
    }

    /// Converts a major-unit amount into the smallest unit (fils, halala, cents).
    ///
    /// Sub-unit fractions are rounded half away from zero.
    pub fn to_smallest_unit(&self, amount: Decimal) -> i64 {
        let scaled = (amount * self.multiplier())
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        // Decimal -> i64 only fails beyond i64 range; clamp rather than panic
        i64::try_from(scaled).unwrap_or(if scaled.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    /// Converts a smallest-unit integer back into a major-unit amount.
    pub fn from_smallest_unit(&self, units: i64) -> Decimal {
        Decimal::new(units, self.scale())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::KWD => "KWD",
            Currency::SAR => "SAR",
            Currency::AED => "AED",
            Currency::BHD => "BHD",
            Currency::EGP => "EGP",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::QAR => "QAR",
            Currency::USD => "USD",
            Currency::OMR => "OMR",
            Currency::JOD => "JOD",
        }
    }

    /// Formats an amount for display with the correct decimal places
    pub fn format_amount(&self, amount: Decimal) -> String {
        let rounded =
            amount.round_dp_with_strategy(self.scale(), RoundingStrategy::MidpointAwayFromZero);
        format!("{} {:.width$}", self, rounded, width = self.scale() as usize)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| format!("Unsupported currency: {}", s))
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
