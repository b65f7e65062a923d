//! Registry of the energy counters owned by one configuration entry.
use chrono::{DateTime, Local};
use tokio::sync::RwLock;

use super::energy::{EnergyAccumulator, FlowDirection};

/// Point-in-time view of one counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySnapshot {
    pub value_kwh: f64,
    pub last_reset_at: DateTime<Local>,
    pub reset_day: u8,
}

/// Owns the import counter and the optional export counter.
///
/// The registry is created by the container and handed explicitly to
/// whatever needs to update, read, or reset the counters. The manual reset
/// path fans out to every registered counter.
pub struct AccumulatorRegistry {
    import: RwLock<EnergyAccumulator>,
    export: Option<RwLock<EnergyAccumulator>>,
}

impl AccumulatorRegistry {
    pub fn new(reset_day: u8, with_export: bool, now: DateTime<Local>) -> Self {
        AccumulatorRegistry {
            import: RwLock::new(EnergyAccumulator::new(FlowDirection::Import, reset_day, now)),
            export: with_export
                .then(|| RwLock::new(EnergyAccumulator::new(FlowDirection::Export, reset_day, now))),
        }
    }

    pub fn has_export(&self) -> bool {
        self.export.is_some()
    }

    /// Integrate an import power sample and return the updated snapshot.
    pub async fn update_import(
        &self,
        power_w: Option<f64>,
        now: DateTime<Local>,
    ) -> EnergySnapshot {
        let mut accumulator = self.import.write().await;
        accumulator.update(power_w, now);
        snapshot(&accumulator)
    }

    /// Integrate an export power sample, `None` when no export counter is
    /// configured.
    pub async fn update_export(
        &self,
        power_w: Option<f64>,
        now: DateTime<Local>,
    ) -> Option<EnergySnapshot> {
        let export = self.export.as_ref()?;
        let mut accumulator = export.write().await;
        accumulator.update(power_w, now);
        Some(snapshot(&accumulator))
    }

    pub async fn import_snapshot(&self) -> EnergySnapshot {
        snapshot(&*self.import.read().await)
    }

    pub async fn export_snapshot(&self) -> Option<EnergySnapshot> {
        match self.export.as_ref() {
            Some(export) => Some(snapshot(&*export.read().await)),
            None => None,
        }
    }

    /// Seed the import counter from a persisted value. Startup only.
    pub async fn restore_import(&self, value_kwh: f64, reset_day: Option<u8>) {
        self.import.write().await.restore(value_kwh, reset_day);
    }

    /// Seed the export counter from a persisted value. Startup only.
    pub async fn restore_export(&self, value_kwh: f64, reset_day: Option<u8>) {
        if let Some(export) = self.export.as_ref() {
            export.write().await.restore(value_kwh, reset_day);
        }
    }

    /// Manual reset: zero every counter and re-anchor their cycles on
    /// `now`'s day.
    pub async fn reset_all(&self, now: DateTime<Local>) {
        self.import.write().await.reset_and_rebind(now);
        if let Some(export) = self.export.as_ref() {
            export.write().await.reset_and_rebind(now);
        }
    }
}

fn snapshot(accumulator: &EnergyAccumulator) -> EnergySnapshot {
    EnergySnapshot {
        value_kwh: accumulator.value_kwh(),
        last_reset_at: accumulator.last_reset_at(),
        reset_day: accumulator.reset_day(),
    }
}
