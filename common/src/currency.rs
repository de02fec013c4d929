use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported settlement currencies. Amounts are always stored as integers in
/// minor units (cents); a decimal point only ever appears in display output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Eur => write!(f, "EUR"),
            Currency::Gbp => write!(f, "GBP"),
        }
    }
}

impl Currency {
    pub fn all() -> &'static [Currency] {
        &[Currency::Usd, Currency::Eur, Currency::Gbp]
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }
}

/// Format an amount in minor units for display, e.g. `150000` → `"$1,500.00"`.
pub fn format_amount(amount: i64, currency: &Currency) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let major = abs / 100;
    let minor = abs % 100;

    // Group the major part in threes from the right.
    let digits = major.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{sign}{}{grouped}.{minor:02}", currency.symbol())
}
