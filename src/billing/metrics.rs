//! Derived bill metrics.
//!
//! Every monetary line item is a variant of [`DerivedMetric`] declaring its
//! upstream line items; the whole statement is recomputed each cycle by
//! evaluating the dependency graph in topological order. Values are
//! [`MetricValue`] so that "no value yet" stays distinct from zero: an
//! unavailable dependency makes every transitive dependent unavailable.
use std::collections::HashMap;

use super::commune::Commune;
use super::rounding::round_xpf;
use super::tariff::TariffConstants;

/// A value produced for one metric: either a number or not-yet-available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Available(f64),
    Unavailable,
}

impl MetricValue {
    pub fn is_available(&self) -> bool {
        matches!(self, MetricValue::Available(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Available(value) => Some(*value),
            MetricValue::Unavailable => None,
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(value) => MetricValue::Available(value),
            None => MetricValue::Unavailable,
        }
    }
}

/// The derived monetary line items of the simulated bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedMetric {
    /// Fixed charge of the subscribed tier (XPF).
    FixedCharge,
    /// Value of the imported energy (XPF).
    ImportValue,
    /// Communal tax on fixed charge + import value (XPF).
    CommunalTax,
    /// General consumption tax on the subtotal incl. metering fee (XPF).
    GeneralTax,
    /// Credit for exported energy at the buy-back price (XPF).
    ExportCredit,
    /// Bill total (XPF).
    Total,
}

impl DerivedMetric {
    pub const ALL: [DerivedMetric; 6] = [
        DerivedMetric::FixedCharge,
        DerivedMetric::ImportValue,
        DerivedMetric::CommunalTax,
        DerivedMetric::GeneralTax,
        DerivedMetric::ExportCredit,
        DerivedMetric::Total,
    ];

    /// Upstream line items this metric reads.
    pub fn dependencies(&self) -> &'static [DerivedMetric] {
        match self {
            DerivedMetric::FixedCharge => &[],
            DerivedMetric::ImportValue => &[],
            DerivedMetric::CommunalTax => &[DerivedMetric::FixedCharge, DerivedMetric::ImportValue],
            DerivedMetric::GeneralTax => &[
                DerivedMetric::FixedCharge,
                DerivedMetric::ImportValue,
                DerivedMetric::CommunalTax,
            ],
            DerivedMetric::ExportCredit => &[],
            DerivedMetric::Total => &[
                DerivedMetric::FixedCharge,
                DerivedMetric::ImportValue,
                DerivedMetric::CommunalTax,
                DerivedMetric::GeneralTax,
                DerivedMetric::ExportCredit,
            ],
        }
    }
}

/// Inputs of one bill evaluation cycle.
#[derive(Debug, Clone)]
pub struct BillInputs<'a> {
    /// Last known-good tariff snapshot, `None` before the first fetch.
    pub constants: Option<&'a TariffConstants>,
    pub commune: Commune,
    /// Accumulated import energy this cycle (kWh).
    pub energy_import_kwh: MetricValue,
    /// Accumulated export energy this cycle, `None` when no export sensor is
    /// configured (credit is then a hard zero).
    pub energy_export_kwh: Option<MetricValue>,
    /// Configured buy-back price (XPF/kWh).
    pub buyback_price: f64,
}

/// One fully evaluated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BillStatement {
    values: HashMap<DerivedMetric, MetricValue>,
}

impl BillStatement {
    pub fn get(&self, metric: DerivedMetric) -> MetricValue {
        self.values
            .get(&metric)
            .copied()
            .unwrap_or(MetricValue::Unavailable)
    }
}

/// Topological order of the metric graph.
pub fn evaluation_order() -> Vec<DerivedMetric> {
    let mut order: Vec<DerivedMetric> = Vec::with_capacity(DerivedMetric::ALL.len());
    while order.len() < DerivedMetric::ALL.len() {
        let mut progressed = false;
        for metric in DerivedMetric::ALL {
            if order.contains(&metric) {
                continue;
            }
            if metric.dependencies().iter().all(|dep| order.contains(dep)) {
                order.push(metric);
                progressed = true;
            }
        }
        assert!(progressed, "metric dependency cycle");
    }
    order
}

/// Evaluate the full statement for one cycle.
pub fn compose(inputs: &BillInputs) -> BillStatement {
    let mut values = HashMap::with_capacity(DerivedMetric::ALL.len());
    for metric in evaluation_order() {
        let value = compute(metric, inputs, &values);
        values.insert(metric, value);
    }
    BillStatement { values }
}

fn compute(
    metric: DerivedMetric,
    inputs: &BillInputs,
    computed: &HashMap<DerivedMetric, MetricValue>,
) -> MetricValue {
    if metric
        .dependencies()
        .iter()
        .any(|dep| !computed[dep].is_available())
    {
        return MetricValue::Unavailable;
    }
    let dep = |m: DerivedMetric| computed[&m].as_f64().expect("dependency checked above");

    match metric {
        DerivedMetric::FixedCharge => inputs.constants.map(|c| c.fixed_charge).into(),
        DerivedMetric::ImportValue => inputs
            .constants
            .and_then(|c| {
                let kwh = inputs.energy_import_kwh.as_f64()?;
                Some(round_xpf(kwh * c.purchase_price))
            })
            .into(),
        DerivedMetric::CommunalTax => inputs
            .constants
            .map(|c| {
                let rate = c.communal_rate(inputs.commune);
                round_xpf((dep(DerivedMetric::FixedCharge) + dep(DerivedMetric::ImportValue)) * rate)
            })
            .into(),
        DerivedMetric::GeneralTax => inputs
            .constants
            .map(|c| {
                let base = dep(DerivedMetric::FixedCharge)
                    + dep(DerivedMetric::ImportValue)
                    + dep(DerivedMetric::CommunalTax)
                    + c.metering_fee;
                round_xpf(base * c.general_tax_rate)
            })
            .into(),
        DerivedMetric::ExportCredit => match inputs.energy_export_kwh {
            None => MetricValue::Available(0.0),
            Some(energy_kwh) => energy_kwh
                .as_f64()
                .map(|kwh| round_xpf(kwh * inputs.buyback_price))
                .into(),
        },
        DerivedMetric::Total => inputs
            .constants
            .map(|c| {
                round_xpf(
                    dep(DerivedMetric::FixedCharge)
                        + dep(DerivedMetric::ImportValue)
                        + dep(DerivedMetric::CommunalTax)
                        + c.metering_fee
                        + dep(DerivedMetric::GeneralTax)
                        - dep(DerivedMetric::ExportCredit),
                )
            })
            .into(),
    }
}
