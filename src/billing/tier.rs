//! Subscribed power tiers.
use strum_macros::{Display, EnumString};

/// Subscribed power capacity bracket of the electricity contract.
///
/// The tier selects both the fixed charge and the purchase price in the
/// tariff dataset. The string form is the tariff dataset lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum PowerTier {
    #[strum(to_string = "PS3", serialize = "3", serialize = "3.3")]
    Ps3,
    #[strum(to_string = "PS6", serialize = "6", serialize = "6.6")]
    Ps6,
    #[strum(to_string = "PS9", serialize = "9", serialize = "9.9")]
    Ps9,
}

impl PowerTier {
    /// Subscribed capacity in kVA.
    pub fn kva(&self) -> f64 {
        match self {
            PowerTier::Ps3 => 3.3,
            PowerTier::Ps6 => 6.6,
            PowerTier::Ps9 => 9.9,
        }
    }
}
