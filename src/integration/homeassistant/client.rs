//! Home Assistant Client.
//! This client is the higher level API client for Home Assistant.

use super::Result;
use super::http_client::HttpClient;
use super::schemas::StateCreateOrUpdate;
use chrono::{DateTime, TimeZone};
use reqwest::Url;

/// The sensors published for the simulated bill.
///
/// Each variant carries its fixed entity id and display metadata so that the
/// wiring between producers and published entities is resolved here once,
/// not re-derived from strings at every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillSensor {
    FixedCharge,
    PurchasePrice,
    MeteringFee,
    GeneralTaxRate,
    CommunalTaxRate,
    BuybackPrice,
    EnergyImported,
    EnergyExported,
    ImportValue,
    ExportValue,
    CommunalTaxAmount,
    GeneralTaxAmount,
    Total,
}

impl BillSensor {
    pub fn entity_id(&self) -> &'static str {
        match self {
            BillSensor::FixedCharge => "sensor.prime_fixe",
            BillSensor::PurchasePrice => "sensor.prix_achat",
            BillSensor::MeteringFee => "sensor.redevance_comptage",
            BillSensor::GeneralTaxRate => "sensor.taux_tgc",
            BillSensor::CommunalTaxRate => "sensor.taxe_communale",
            BillSensor::BuybackPrice => "sensor.prix_rachat_config",
            BillSensor::EnergyImported => "sensor.energie_importee",
            BillSensor::EnergyExported => "sensor.energie_exportee",
            BillSensor::ImportValue => "sensor.valeur_energie_importee",
            BillSensor::ExportValue => "sensor.valeur_exportee",
            BillSensor::CommunalTaxAmount => "sensor.montant_taxe_communale",
            BillSensor::GeneralTaxAmount => "sensor.montant_tgc",
            BillSensor::Total => "sensor.facture_totale",
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            BillSensor::FixedCharge => "Prime fixe",
            BillSensor::PurchasePrice => "Prix d'achat",
            BillSensor::MeteringFee => "Redevance comptage",
            BillSensor::GeneralTaxRate => "Taux TGC",
            BillSensor::CommunalTaxRate => "Taxe communale",
            BillSensor::BuybackPrice => "Prix de rachat configuré",
            BillSensor::EnergyImported => "Énergie importée",
            BillSensor::EnergyExported => "Énergie exportée",
            BillSensor::ImportValue => "Valeur énergie importée",
            BillSensor::ExportValue => "Valeur exportée",
            BillSensor::CommunalTaxAmount => "Montant taxe communale",
            BillSensor::GeneralTaxAmount => "Montant TGC",
            BillSensor::Total => "Facture totale",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            BillSensor::FixedCharge
            | BillSensor::MeteringFee
            | BillSensor::ImportValue
            | BillSensor::ExportValue
            | BillSensor::CommunalTaxAmount
            | BillSensor::GeneralTaxAmount
            | BillSensor::Total => "XPF",
            BillSensor::PurchasePrice | BillSensor::BuybackPrice => "XPF/kWh",
            BillSensor::GeneralTaxRate | BillSensor::CommunalTaxRate => "%",
            BillSensor::EnergyImported | BillSensor::EnergyExported => "kWh",
        }
    }
}

/// Restored view of a previously published energy sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyRestore {
    pub value_kwh: f64,
    /// Reset anchor persisted by a previous instance, if any.
    pub reset_day: Option<u8>,
}

pub struct Client {
    http: HttpClient,
}

impl Client {
    /// Creates a new instance of `Client`.
    pub fn new(url: Url, token: String) -> Self {
        let http = HttpClient::new(url, token);
        Client { http }
    }

    /// Read a numeric sensor state.
    ///
    /// Returns `None` when the entity does not exist, reports the
    /// `unknown`/`unavailable` sentinels, or carries a non-numeric state.
    /// None of those are errors, the sample is simply missing this tick.
    pub async fn get_numeric_state(&self, entity_id: &str) -> Result<Option<f64>> {
        let state = self.http.get_state(entity_id).await?;
        Ok(state.and_then(|s| Self::parse_numeric_state(&s.state)))
    }

    /// Read a raw state string, `None` for absent or sentinel states.
    pub async fn get_raw_state(&self, entity_id: &str) -> Result<Option<String>> {
        let state = self.http.get_state(entity_id).await?;
        Ok(state.and_then(|s| match s.state.as_str() {
            "unknown" | "unavailable" => None,
            _ => Some(s.state),
        }))
    }

    /// Read back a previously published energy counter.
    ///
    /// Returns `None` when the sensor does not exist or has no numeric
    /// state, i.e. there is nothing to restore.
    pub async fn get_energy_state(&self, entity_id: &str) -> Result<Option<EnergyRestore>> {
        let Some(state) = self.http.get_state(entity_id).await? else {
            return Ok(None);
        };
        let Some(value_kwh) = Self::parse_numeric_state(&state.state) else {
            return Ok(None);
        };
        let reset_day = state
            .attributes
            .get("reset_day")
            .and_then(|value| value.as_str())
            .and_then(|day| day.parse().ok());
        Ok(Some(EnergyRestore {
            value_kwh,
            reset_day,
        }))
    }

    /// Publish an accumulated energy counter (kWh).
    ///
    /// The reset day rides along as an attribute so a restarted instance can
    /// restore an anchor rebound by a manual reset.
    pub async fn set_energy<Tz: TimeZone>(
        &self,
        sensor: BillSensor,
        energy_kwh: f64,
        last_reset: &DateTime<Tz>,
        reset_day: u8,
    ) -> Result<()> {
        let state = Self::create_energy_state(sensor, energy_kwh, last_reset, reset_day);
        self.http.set_state(sensor.entity_id(), &state).await?;
        Ok(())
    }

    /// Publish a monetary amount (whole XPF).
    pub async fn set_money(&self, sensor: BillSensor, amount_xpf: f64) -> Result<()> {
        let state = Self::create_money_state(sensor, amount_xpf);
        self.http.set_state(sensor.entity_id(), &state).await?;
        Ok(())
    }

    /// Publish a tax rate, displayed as a percentage.
    pub async fn set_tax_rate(&self, sensor: BillSensor, rate: f64) -> Result<()> {
        let state = Self::create_rate_state(sensor, rate);
        self.http.set_state(sensor.entity_id(), &state).await?;
        Ok(())
    }

    /// Publish a price (XPF/kWh).
    pub async fn set_price(&self, sensor: BillSensor, price: f64) -> Result<()> {
        let state = Self::create_price_state(sensor, price);
        self.http.set_state(sensor.entity_id(), &state).await?;
        Ok(())
    }

    /// Mark a sensor as unavailable.
    pub async fn set_unavailable(&self, sensor: BillSensor) -> Result<()> {
        let state = Self::create_unavailable_state(sensor);
        self.http.set_state(sensor.entity_id(), &state).await?;
        Ok(())
    }

    fn parse_numeric_state(state: &str) -> Option<f64> {
        match state {
            "unknown" | "unavailable" => None,
            other => other.parse().ok(),
        }
    }

    /// Create the state body for an energy counter.
    fn create_energy_state<Tz: TimeZone>(
        sensor: BillSensor,
        energy_kwh: f64,
        last_reset: &DateTime<Tz>,
        reset_day: u8,
    ) -> StateCreateOrUpdate {
        StateCreateOrUpdate {
            state: format!("{energy_kwh:.2}"),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), sensor.unit().to_string()),
                    (
                        "friendly_name".to_string(),
                        sensor.friendly_name().to_string(),
                    ),
                    ("device_class".to_string(), "energy".to_string()),
                    ("state_class".to_string(), "total".to_string()),
                    ("last_reset".to_string(), last_reset.to_rfc3339()),
                    ("reset_day".to_string(), reset_day.to_string()),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }

    /// Create the state body for a monetary amount.
    fn create_money_state(sensor: BillSensor, amount_xpf: f64) -> StateCreateOrUpdate {
        StateCreateOrUpdate {
            state: format!("{amount_xpf:.0}"),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), sensor.unit().to_string()),
                    (
                        "friendly_name".to_string(),
                        sensor.friendly_name().to_string(),
                    ),
                    ("device_class".to_string(), "monetary".to_string()),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }

    /// Create the state body for a tax rate, converted to percent.
    fn create_rate_state(sensor: BillSensor, rate: f64) -> StateCreateOrUpdate {
        let percent = (rate * 10_000.0).round() / 100.0;
        StateCreateOrUpdate {
            state: percent.to_string(),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), sensor.unit().to_string()),
                    (
                        "friendly_name".to_string(),
                        sensor.friendly_name().to_string(),
                    ),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }

    /// Create the state body for a price.
    fn create_price_state(sensor: BillSensor, price: f64) -> StateCreateOrUpdate {
        StateCreateOrUpdate {
            state: price.to_string(),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), sensor.unit().to_string()),
                    (
                        "friendly_name".to_string(),
                        sensor.friendly_name().to_string(),
                    ),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }

    /// Create the unavailable sentinel state body.
    fn create_unavailable_state(sensor: BillSensor) -> StateCreateOrUpdate {
        StateCreateOrUpdate {
            state: "unavailable".to_string(),
            attributes: Some(
                [
                    ("unit_of_measurement".to_string(), sensor.unit().to_string()),
                    (
                        "friendly_name".to_string(),
                        sensor.friendly_name().to_string(),
                    ),
                ]
                .into_iter()
                .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Test client creation with a valid URL and token don't panic.
    #[tokio::test]
    async fn test_new() {
        let url = Url::parse("http://localhost:8123").unwrap();
        let token = String::from("test_token");
        Client::new(url, token);
    }

    #[rstest]
    #[case("1234.5", Some(1234.5))]
    #[case("-567", Some(-567.0))]
    #[case("0", Some(0.0))]
    #[case("unknown", None)]
    #[case("unavailable", None)]
    #[case("not a number", None)]
    fn test_parse_numeric_state(#[case] state: &str, #[case] expected: Option<f64>) {
        assert_eq!(Client::parse_numeric_state(state), expected);
    }

    #[rstest]
    #[case(0.0, "0.00")]
    #[case(1.25, "1.25")]
    #[case(42.5, "42.50")]
    fn test_create_energy_state(#[case] kwh: f64, #[case] expected_state: &str) {
        let last_reset = DateTime::parse_from_rfc3339("2025-03-01T00:00:00+11:00").unwrap();

        let state = Client::create_energy_state(BillSensor::EnergyImported, kwh, &last_reset, 1);

        assert_eq!(state.state, expected_state);
        let attributes = state.attributes.unwrap();
        assert_eq!(attributes["unit_of_measurement"], "kWh");
        assert_eq!(attributes["friendly_name"], "Énergie importée");
        assert_eq!(attributes["device_class"], "energy");
        assert_eq!(attributes["state_class"], "total");
        assert_eq!(attributes["last_reset"], "2025-03-01T00:00:00+11:00");
        assert_eq!(attributes["reset_day"], "1");
    }

    #[rstest]
    #[case(5217.0, "5217")]
    #[case(0.0, "0")]
    #[case(-150.0, "-150")]
    fn test_create_money_state(#[case] amount: f64, #[case] expected_state: &str) {
        let state = Client::create_money_state(BillSensor::Total, amount);

        assert_eq!(state.state, expected_state);
        let attributes = state.attributes.unwrap();
        assert_eq!(attributes["unit_of_measurement"], "XPF");
        assert_eq!(attributes["friendly_name"], "Facture totale");
        assert_eq!(attributes["device_class"], "monetary");
    }

    #[rstest]
    #[case(0.11, "11")]
    #[case(0.0525, "5.25")]
    #[case(0.0, "0")]
    fn test_create_rate_state(#[case] rate: f64, #[case] expected_state: &str) {
        let state = Client::create_rate_state(BillSensor::GeneralTaxRate, rate);

        assert_eq!(state.state, expected_state);
        let attributes = state.attributes.unwrap();
        assert_eq!(attributes["unit_of_measurement"], "%");
        assert_eq!(attributes["friendly_name"], "Taux TGC");
    }

    #[test]
    fn test_create_price_state() {
        let state = Client::create_price_state(BillSensor::PurchasePrice, 31.5);

        assert_eq!(state.state, "31.5");
        assert_eq!(state.attributes.unwrap()["unit_of_measurement"], "XPF/kWh");
    }

    #[test]
    fn test_create_unavailable_state() {
        let state = Client::create_unavailable_state(BillSensor::Total);

        assert_eq!(state.state, "unavailable");
        let attributes = state.attributes.unwrap();
        assert_eq!(attributes["friendly_name"], "Facture totale");
        assert_eq!(attributes["unit_of_measurement"], "XPF");
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let sensors = [
            BillSensor::FixedCharge,
            BillSensor::PurchasePrice,
            BillSensor::MeteringFee,
            BillSensor::GeneralTaxRate,
            BillSensor::CommunalTaxRate,
            BillSensor::BuybackPrice,
            BillSensor::EnergyImported,
            BillSensor::EnergyExported,
            BillSensor::ImportValue,
            BillSensor::ExportValue,
            BillSensor::CommunalTaxAmount,
            BillSensor::GeneralTaxAmount,
            BillSensor::Total,
        ];
        let ids: std::collections::HashSet<_> = sensors.iter().map(|s| s.entity_id()).collect();
        assert_eq!(ids.len(), sensors.len());
    }
}
