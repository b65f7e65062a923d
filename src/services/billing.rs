//! Billing Background Service.
//! This service turns raw power sensors into a simulated monthly electricity
//! bill, keeping the tariff constants, the energy counters, and the derived
//! bill sensors in sync with Home Assistant.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;

use crate::billing::{
    AccumulatorRegistry, BillInputs, BillStatement, Commune, DerivedMetric, MetricValue, PowerTier,
    TariffConstants, metrics, registry::EnergySnapshot,
};
use crate::integration::homeassistant::{self, BillSensor};
use crate::integration::tariff;

/// Read-only per-installation settings of the billing service.
#[derive(Debug, Clone)]
pub struct BillingSettings {
    pub tier: PowerTier,
    pub commune: Commune,
    /// Buy-back price for exported energy (XPF/kWh).
    pub buyback_price: f64,
    /// Entity id of the import power sensor (W).
    pub sensor_import: String,
    /// Entity id of the export power sensor (W), if any.
    pub sensor_export: Option<String>,
    /// Entity id of the manual reset `input_button`, if any.
    pub reset_button: Option<String>,
    pub sync_tariff_interval: Duration,
    pub sync_energy_interval: Duration,
    pub sync_bill_interval: Duration,
    pub watch_reset_interval: Duration,
}

/// Line items published by the bill sync and their target sensors.
///
/// The fixed charge sensor is fed directly by the tariff sync, the graph
/// still computes the metric internally for its dependents.
const PUBLISHED_METRICS: [(DerivedMetric, BillSensor); 4] = [
    (DerivedMetric::ImportValue, BillSensor::ImportValue),
    (DerivedMetric::CommunalTax, BillSensor::CommunalTaxAmount),
    (DerivedMetric::GeneralTax, BillSensor::GeneralTaxAmount),
    (DerivedMetric::Total, BillSensor::Total),
];

pub struct BillingBackgroundService {
    homeassistant: Arc<homeassistant::Client>,
    tariff: Arc<tariff::Client>,
    registry: Arc<AccumulatorRegistry>,
    settings: BillingSettings,
    /// Last known-good tariff snapshot, kept across failed refreshes.
    constants: RwLock<Option<TariffConstants>>,
    /// Last state published per sensor, `None` marks unavailable.
    published: RwLock<HashMap<BillSensor, Option<f64>>>,
}

impl BillingBackgroundService {
    /// Creates a new instance of `BillingBackgroundService`.
    pub fn new(
        homeassistant: Arc<homeassistant::Client>,
        tariff: Arc<tariff::Client>,
        registry: Arc<AccumulatorRegistry>,
        settings: BillingSettings,
    ) -> Self {
        BillingBackgroundService {
            homeassistant,
            tariff,
            registry,
            settings,
            constants: RwLock::new(None),
            published: RwLock::new(HashMap::new()),
        }
    }

    /// Run the periodic sync loops until shutdown is requested.
    pub async fn run(&self, shutdown_token: CancellationToken) {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                log::info!("Billing service shutdown requested");
            }
            _ = async {
                tokio::join!(
                    self.sync_tariffs_task(self.settings.sync_tariff_interval),
                    self.sync_energy_task(self.settings.sync_energy_interval),
                    self.sync_bill_task(self.settings.sync_bill_interval),
                    self.watch_reset_task(self.settings.watch_reset_interval),
                )
            } => {}
        }
    }

    /// Restore the energy counters from their previously published states
    /// and publish the static configuration sensor. Startup only.
    pub async fn restore(&self) -> Result<(), anyhow::Error> {
        if let Some(restored) = self
            .homeassistant
            .get_energy_state(BillSensor::EnergyImported.entity_id())
            .await?
        {
            self.registry
                .restore_import(restored.value_kwh, restored.reset_day)
                .await;
            log::info!("Restored import counter: {} kWh", restored.value_kwh);
        }
        if self.registry.has_export() {
            if let Some(restored) = self
                .homeassistant
                .get_energy_state(BillSensor::EnergyExported.entity_id())
                .await?
            {
                self.registry
                    .restore_export(restored.value_kwh, restored.reset_day)
                    .await;
                log::info!("Restored export counter: {} kWh", restored.value_kwh);
            }
        }
        self.publish(BillSensor::BuybackPrice, self.settings.buyback_price)
            .await?;
        Ok(())
    }

    /// Periodically refreshes the tariff constants.
    async fn sync_tariffs_task(&self, period: Duration) {
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = self.sync_tariffs().await {
                log::error!("Error refreshing tariff constants: {e}");
            }
        }
    }

    /// Periodically integrates the power sensors into the energy counters.
    async fn sync_energy_task(&self, period: Duration) {
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = self.sync_energy(Local::now()).await {
                log::error!("Error syncing energy counters: {e}");
            }
        }
    }

    /// Periodically recomputes and publishes the bill line items.
    async fn sync_bill_task(&self, period: Duration) {
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = self.sync_bill().await {
                log::error!("Error syncing bill: {e}");
            }
        }
    }

    /// Periodically watches the manual reset button.
    async fn watch_reset_task(&self, period: Duration) {
        let mut last_pressed = None;
        let mut interval = interval(period);
        loop {
            interval.tick().await;
            match self.watch_reset(last_pressed.clone(), Local::now()).await {
                Ok(pressed) => last_pressed = pressed,
                Err(e) => log::error!("Error watching reset button: {e}"),
            }
        }
    }

    /// Fetch the tariff constants and publish the constant sensors.
    ///
    /// On a failed fetch the previous snapshot stays in place so every
    /// dependent keeps its last good value until the next attempt.
    pub async fn sync_tariffs(&self) -> Result<(), anyhow::Error> {
        let constants = self.tariff.fetch(self.settings.tier).await?;

        self.publish(BillSensor::FixedCharge, constants.fixed_charge)
            .await?;
        self.publish(BillSensor::PurchasePrice, constants.purchase_price)
            .await?;
        self.publish(BillSensor::MeteringFee, constants.metering_fee)
            .await?;
        self.publish(BillSensor::GeneralTaxRate, constants.general_tax_rate)
            .await?;
        self.publish(
            BillSensor::CommunalTaxRate,
            constants.communal_rate(self.settings.commune),
        )
        .await?;

        *self.constants.write().await = Some(constants);
        Ok(())
    }

    /// Read the power sensors and advance the energy counters.
    ///
    /// A power sensor with no usable value this tick skips its counter
    /// silently, per the accumulator contract.
    pub async fn sync_energy(&self, now: DateTime<Local>) -> Result<(), anyhow::Error> {
        let power = self
            .homeassistant
            .get_numeric_state(&self.settings.sensor_import)
            .await?;
        let import = self.registry.update_import(power, now).await;
        self.publish_energy(BillSensor::EnergyImported, import).await?;

        if let Some(sensor_export) = &self.settings.sensor_export {
            let power = self.homeassistant.get_numeric_state(sensor_export).await?;
            if let Some(export) = self.registry.update_export(power, now).await {
                self.publish_energy(BillSensor::EnergyExported, export).await?;
            }
        }
        Ok(())
    }

    /// Recompute the full statement and publish the derived sensors.
    pub async fn sync_bill(&self) -> Result<BillStatement, anyhow::Error> {
        let constants = self.constants.read().await.clone();
        let import = self.registry.import_snapshot().await;
        let export = self.registry.export_snapshot().await;

        let inputs = BillInputs {
            constants: constants.as_ref(),
            commune: self.settings.commune,
            energy_import_kwh: MetricValue::Available(import.value_kwh),
            energy_export_kwh: export.map(|snapshot| MetricValue::Available(snapshot.value_kwh)),
            buyback_price: self.settings.buyback_price,
        };
        let statement = metrics::compose(&inputs);

        for (metric, sensor) in PUBLISHED_METRICS {
            self.publish_metric(sensor, statement.get(metric)).await?;
        }
        if self.settings.sensor_export.is_some() {
            self.publish_metric(
                BillSensor::ExportValue,
                statement.get(DerivedMetric::ExportCredit),
            )
            .await?;
        }
        Ok(statement)
    }

    /// Watch the manual reset button and trigger the reset path when its
    /// press timestamp changes.
    ///
    /// The first observation after startup only primes the watcher,
    /// otherwise a press that happened while the service was down would
    /// replay on boot.
    pub async fn watch_reset(
        &self,
        last_pressed: Option<String>,
        now: DateTime<Local>,
    ) -> Result<Option<String>, anyhow::Error> {
        let Some(button) = &self.settings.reset_button else {
            return Ok(None);
        };
        let pressed = self.homeassistant.get_raw_state(button).await?;
        match (last_pressed, pressed) {
            (Some(previous), Some(current)) if current != previous => {
                log::info!("Manual reset requested via {button}");
                self.manual_reset(now).await?;
                Ok(Some(current))
            }
            (previous, None) => Ok(previous),
            (_, current) => Ok(current),
        }
    }

    /// Zero every counter, re-anchor the monthly cycle on today, and push
    /// the zeroed counters out immediately.
    pub async fn manual_reset(&self, now: DateTime<Local>) -> Result<(), anyhow::Error> {
        self.registry.reset_all(now).await;

        let import = self.registry.import_snapshot().await;
        self.set_energy(BillSensor::EnergyImported, import).await?;
        if let Some(export) = self.registry.export_snapshot().await {
            self.set_energy(BillSensor::EnergyExported, export).await?;
        }
        Ok(())
    }

    /// Publish a derived line item.
    ///
    /// An unavailable value is only pushed for a sensor that never had a
    /// good value, otherwise the last good state stays on display.
    async fn publish_metric(
        &self,
        sensor: BillSensor,
        value: MetricValue,
    ) -> Result<(), homeassistant::Error> {
        match value {
            MetricValue::Available(amount) => self.publish(sensor, amount).await,
            MetricValue::Unavailable => {
                let previously = self.published.read().await.get(&sensor).copied();
                if previously.is_none() {
                    self.homeassistant.set_unavailable(sensor).await?;
                    self.record(sensor, None).await;
                }
                Ok(())
            }
        }
    }

    /// Publish a numeric sensor value if it changed since the last publish.
    async fn publish(&self, sensor: BillSensor, value: f64) -> Result<(), homeassistant::Error> {
        if self.published.read().await.get(&sensor) == Some(&Some(value)) {
            return Ok(());
        }
        match sensor {
            BillSensor::GeneralTaxRate | BillSensor::CommunalTaxRate => {
                self.homeassistant.set_tax_rate(sensor, value).await?;
            }
            BillSensor::PurchasePrice | BillSensor::BuybackPrice => {
                self.homeassistant.set_price(sensor, value).await?;
            }
            _ => self.homeassistant.set_money(sensor, value).await?,
        }
        self.record(sensor, Some(value)).await;
        log::debug!("Published {}: {value}", sensor.entity_id());
        Ok(())
    }

    /// Publish an energy counter if it changed since the last publish.
    async fn publish_energy(
        &self,
        sensor: BillSensor,
        snapshot: EnergySnapshot,
    ) -> Result<(), homeassistant::Error> {
        if self.published.read().await.get(&sensor) == Some(&Some(snapshot.value_kwh)) {
            return Ok(());
        }
        self.set_energy(sensor, snapshot).await
    }

    /// Publish an energy counter unconditionally.
    async fn set_energy(
        &self,
        sensor: BillSensor,
        snapshot: EnergySnapshot,
    ) -> Result<(), homeassistant::Error> {
        self.homeassistant
            .set_energy(
                sensor,
                snapshot.value_kwh,
                &snapshot.last_reset_at,
                snapshot.reset_day,
            )
            .await?;
        self.record(sensor, Some(snapshot.value_kwh)).await;
        log::debug!("Published {}: {} kWh", sensor.entity_id(), snapshot.value_kwh);
        Ok(())
    }

    async fn record(&self, sensor: BillSensor, value: Option<f64>) {
        self.published.write().await.insert(sensor, value);
    }
}
