//! Tariff constants snapshot.
use std::collections::HashMap;

use super::commune::Commune;

/// Snapshot of the pricing and tax constants for the configured tier.
///
/// Replaced wholesale on every successful refresh, never mutated in place.
/// Rates are fractions, amounts are XPF.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffConstants {
    /// Fixed charge for the billing cycle (XPF).
    pub fixed_charge: f64,
    /// Purchase price of imported energy (XPF/kWh).
    pub purchase_price: f64,
    /// Flat metering service fee (XPF).
    pub metering_fee: f64,
    /// General consumption tax rate (fraction).
    pub general_tax_rate: f64,
    /// Communal tax rates keyed by simplified commune name.
    pub communal_tax_rates: HashMap<String, f64>,
}

impl TariffConstants {
    /// Communal tax rate for a municipality.
    ///
    /// A commune missing from the dataset resolves to 0, newly created
    /// municipalities may lag the backing data.
    pub fn communal_rate(&self, commune: Commune) -> f64 {
        self.communal_tax_rates
            .get(&commune.oracle_key())
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> TariffConstants {
        TariffConstants {
            fixed_charge: 2000.0,
            purchase_price: 20.0,
            metering_fee: 500.0,
            general_tax_rate: 0.11,
            communal_tax_rates: HashMap::from([
                ("noumea".to_string(), 0.05),
                ("dumbea".to_string(), 0.03),
            ]),
        }
    }

    #[test]
    fn test_communal_rate_known() {
        assert_eq!(constants().communal_rate(Commune::Noumea), 0.05);
        assert_eq!(constants().communal_rate(Commune::Dumbea), 0.03);
    }

    #[test]
    fn test_communal_rate_missing_is_zero() {
        assert_eq!(constants().communal_rate(Commune::Farino), 0.0);
    }
}
