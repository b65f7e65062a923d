//! Energy accumulation from instantaneous power samples.
use chrono::{DateTime, Local};

use super::reset::{ResetScheduler, Transition};
use super::rounding::round2;

/// Direction of the energy flow a counter accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// Energy drawn from the grid, counts samples with `power > 0`.
    Import,
    /// Energy fed back to the grid, counts samples with `power < 0`.
    Export,
}

impl FlowDirection {
    fn counts(&self, power_w: f64) -> bool {
        match self {
            FlowDirection::Import => power_w > 0.0,
            FlowDirection::Export => power_w < 0.0,
        }
    }
}

/// Accumulates instantaneous power samples (W) into energy (kWh) since the
/// last monthly reset.
///
/// The value is kept at two decimals and is monotonically non-decreasing
/// between resets. Elapsed wall-clock time is measured between successive
/// sampled ticks; a tick without a usable sample leaves the counter and its
/// clock untouched so no elapsed time is double counted.
#[derive(Debug, Clone)]
pub struct EnergyAccumulator {
    direction: FlowDirection,
    value_kwh: f64,
    last_observed_at: DateTime<Local>,
    last_reset_at: DateTime<Local>,
    schedule: ResetScheduler,
}

impl EnergyAccumulator {
    pub fn new(direction: FlowDirection, reset_day: u8, now: DateTime<Local>) -> Self {
        EnergyAccumulator {
            direction,
            value_kwh: 0.0,
            last_observed_at: now,
            last_reset_at: now,
            schedule: ResetScheduler::new(reset_day),
        }
    }

    /// Accumulated energy since the last reset (kWh, two decimals).
    pub fn value_kwh(&self) -> f64 {
        self.value_kwh
    }

    /// Start of the current accumulation cycle.
    pub fn last_reset_at(&self) -> DateTime<Local> {
        self.last_reset_at
    }

    pub fn reset_day(&self) -> u8 {
        self.schedule.reset_day()
    }

    /// Seed the counter from a previously persisted value, and rebind the
    /// reset anchor when one was persisted along with it. Startup only.
    pub fn restore(&mut self, value_kwh: f64, reset_day: Option<u8>) {
        self.value_kwh = round2(value_kwh.max(0.0));
        if let Some(day) = reset_day {
            self.schedule = ResetScheduler::new(day);
        }
    }

    /// Integrate one power sample observed at `now`.
    ///
    /// `None` means the upstream sensor had no usable reading this tick and
    /// is silently skipped. The monthly boundary is applied before the new
    /// delta so the first tick of the reset day starts the new cycle.
    pub fn update(&mut self, power_w: Option<f64>, now: DateTime<Local>) {
        let Some(power_w) = power_w else {
            return;
        };
        if !power_w.is_finite() {
            return;
        }

        if self.schedule.check(self.last_observed_at, now) == Transition::JustReset {
            self.value_kwh = 0.0;
            self.last_reset_at = now;
        }

        let elapsed_hours =
            ((now - self.last_observed_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
        if self.direction.counts(power_w) {
            let delta_kwh = power_w.abs() * elapsed_hours / 1000.0;
            self.value_kwh = round2(self.value_kwh + delta_kwh);
        }
        self.last_observed_at = now;
    }

    /// Manual reset: zero the counter now and re-anchor the monthly cycle on
    /// today's calendar day.
    ///
    /// Idempotent within a day, a second application finds the counter
    /// already at zero.
    pub fn reset_and_rebind(&mut self, now: DateTime<Local>) {
        self.schedule.force(now);
        self.value_kwh = 0.0;
        self.last_reset_at = now;
        self.last_observed_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn accumulator(direction: FlowDirection) -> EnergyAccumulator {
        EnergyAccumulator::new(direction, 1, start())
    }

    #[test]
    fn test_accumulates_import_power() {
        let mut acc = accumulator(FlowDirection::Import);
        // 1000 W over one hour = 1 kWh
        acc.update(Some(1000.0), start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 1.0);
        // 500 W over 30 more minutes = 0.25 kWh
        acc.update(Some(500.0), start() + Duration::minutes(90));
        assert_eq!(acc.value_kwh(), 1.25);
    }

    #[test]
    fn test_import_ignores_export_sign() {
        let mut acc = accumulator(FlowDirection::Import);
        acc.update(Some(-1000.0), start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 0.0);
        // The clock still advanced, the next hour only counts once.
        acc.update(Some(1000.0), start() + Duration::hours(2));
        assert_eq!(acc.value_kwh(), 1.0);
    }

    #[test]
    fn test_export_counts_negative_power_as_positive_energy() {
        let mut acc = accumulator(FlowDirection::Export);
        acc.update(Some(-2000.0), start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 2.0);
        acc.update(Some(2000.0), start() + Duration::hours(2));
        assert_eq!(acc.value_kwh(), 2.0);
    }

    #[test]
    fn test_unavailable_sample_is_a_silent_no_op() {
        let mut acc = accumulator(FlowDirection::Import);
        acc.update(None, start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 0.0);
        // Elapsed time spans the skipped tick: two full hours at 1 kW.
        acc.update(Some(1000.0), start() + Duration::hours(2));
        assert_eq!(acc.value_kwh(), 2.0);
    }

    #[test]
    fn test_non_finite_sample_is_skipped() {
        let mut acc = accumulator(FlowDirection::Import);
        acc.update(Some(f64::NAN), start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 0.0);
        acc.update(Some(f64::INFINITY), start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 0.0);
    }

    #[test]
    fn test_value_keeps_two_decimals() {
        let mut acc = accumulator(FlowDirection::Import);
        // 100 W over 6 minutes = 0.01 kWh
        acc.update(Some(100.0), start() + Duration::minutes(6));
        assert_eq!(acc.value_kwh(), 0.01);
    }

    #[test]
    fn test_monthly_reset_zeroes_before_new_delta() {
        let mut acc = EnergyAccumulator::new(
            FlowDirection::Import,
            15,
            Local.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(),
        );
        acc.restore(42.5, None);
        assert_eq!(acc.value_kwh(), 42.5);

        // First tick on day 15: value zeroes, then that tick's delta applies.
        let tick = Local.with_ymd_and_hms(2025, 3, 15, 0, 30, 0).unwrap();
        acc.update(Some(2000.0), tick);
        // 2000 W over 12.5 h would be 25 kWh from the old cycle, only the
        // post-reset delta remains.
        assert_eq!(acc.value_kwh(), 25.0);
        assert_eq!(acc.last_reset_at(), tick);

        // Later ticks on day 15 accumulate normally.
        acc.update(Some(2000.0), tick + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 27.0);
    }

    #[test]
    fn test_manual_reset_rebinds_and_is_idempotent() {
        let mut acc = accumulator(FlowDirection::Import);
        acc.update(Some(1000.0), start() + Duration::hours(1));
        assert_eq!(acc.value_kwh(), 1.0);

        let pressed = start() + Duration::hours(2);
        acc.reset_and_rebind(pressed);
        assert_eq!(acc.value_kwh(), 0.0);
        assert_eq!(acc.reset_day(), 10);

        // Second press the same instant changes nothing.
        acc.reset_and_rebind(pressed);
        assert_eq!(acc.value_kwh(), 0.0);
        assert_eq!(acc.reset_day(), 10);
    }

    #[test]
    fn test_restore_rounds_and_clamps() {
        let mut acc = accumulator(FlowDirection::Import);
        acc.restore(12.3456, None);
        assert_eq!(acc.value_kwh(), 12.35);
        assert_eq!(acc.reset_day(), 1);
        acc.restore(-3.0, None);
        assert_eq!(acc.value_kwh(), 0.0);
    }

    #[test]
    fn test_restore_rebinds_persisted_reset_day() {
        let mut acc = accumulator(FlowDirection::Import);
        acc.restore(42.5, Some(22));
        assert_eq!(acc.value_kwh(), 42.5);
        assert_eq!(acc.reset_day(), 22);
    }
}
