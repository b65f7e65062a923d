//! Dependency injection container for facturenc.

use std::sync::Arc;

use chrono::Local;

use super::config::Config;
use crate::billing::AccumulatorRegistry;
use crate::integration::{homeassistant, tariff};
use crate::services::{BillingBackgroundService, BillingSettings};

/// Container for application dependencies.
pub struct Container {
    config: Arc<Config>,
    homeassistant: Arc<homeassistant::Client>,
    tariff: Arc<tariff::Client>,
    registry: Arc<AccumulatorRegistry>,
    billing_service: Arc<BillingBackgroundService>,
}

impl Container {
    /// Creates a new instance of the dependency injection container.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let homeassistant = Arc::new(homeassistant::Client::new(
            config.homeassistant_url.clone(),
            config.homeassistant_token.clone(),
        ));

        let tariff = Arc::new(tariff::Client::new(config.tariff_url.clone()));

        let registry = Arc::new(AccumulatorRegistry::new(
            config.reset_day.0,
            config.sensor_export.is_some(),
            Local::now(),
        ));

        let settings = BillingSettings {
            tier: config.puissance,
            commune: config.commune,
            buyback_price: config.prix_rachat.0,
            sensor_import: config.sensor_import.clone(),
            sensor_export: config.sensor_export.clone(),
            reset_button: config.reset_button.clone(),
            sync_tariff_interval: config.sync_tariff_interval.into(),
            sync_energy_interval: config.sync_energy_interval.into(),
            sync_bill_interval: config.sync_bill_interval.into(),
            watch_reset_interval: config.watch_reset_interval.into(),
        };

        let billing_service = Arc::new(BillingBackgroundService::new(
            Arc::clone(&homeassistant),
            Arc::clone(&tariff),
            Arc::clone(&registry),
            settings,
        ));

        Self {
            config,
            homeassistant,
            tariff,
            registry,
            billing_service,
        }
    }

    /// Returns a reference to the application config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a reference to the billing service.
    pub fn billing_service(&self) -> Arc<BillingBackgroundService> {
        Arc::clone(&self.billing_service)
    }

    /// Returns a reference to the Home Assistant client.
    pub fn homeassistant_client(&self) -> Arc<homeassistant::Client> {
        Arc::clone(&self.homeassistant)
    }

    /// Returns a reference to the tariff client.
    pub fn tariff_client(&self) -> Arc<tariff::Client> {
        Arc::clone(&self.tariff)
    }

    /// Returns a reference to the accumulator registry.
    pub fn registry(&self) -> Arc<AccumulatorRegistry> {
        Arc::clone(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{Commune, PowerTier};
    use crate::core::config::{BuybackPrice, ResetDay};
    use humantime::Duration;

    fn config() -> Config {
        Config {
            app_log: "info".into(),
            app_log_style: "auto".into(),
            homeassistant_url: reqwest::Url::parse("http://localhost:8123").unwrap(),
            homeassistant_token: "token".into(),
            tariff_url: reqwest::Url::parse("http://localhost:8080/data_elec.php").unwrap(),
            commune: Commune::Noumea,
            puissance: PowerTier::Ps6,
            prix_rachat: BuybackPrice(15.0),
            sensor_import: "sensor.linky_power".into(),
            sensor_export: Some("sensor.linky_export".into()),
            reset_button: None,
            reset_day: ResetDay(1),
            sync_tariff_interval: Duration::from(std::time::Duration::from_secs(3600)),
            sync_energy_interval: Duration::from(std::time::Duration::from_secs(30)),
            sync_bill_interval: Duration::from(std::time::Duration::from_secs(60)),
            watch_reset_interval: Duration::from(std::time::Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn test_container_init() {
        let container = Container::new(config());

        assert_eq!(container.config().app_log, "info");
        assert!(container.registry().has_export());
        assert!(Arc::ptr_eq(
            &container.homeassistant_client(),
            &container.homeassistant_client()
        ));
        assert!(Arc::ptr_eq(
            &container.tariff_client(),
            &container.tariff_client()
        ));
        assert!(Arc::ptr_eq(
            &container.billing_service(),
            &container.billing_service()
        ));
    }
}
