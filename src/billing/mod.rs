//! Billing domain: energy accumulation and bill composition.
pub mod commune;
pub mod energy;
pub mod metrics;
pub mod registry;
pub mod reset;
pub mod rounding;
pub mod tariff;
pub mod tier;

pub use commune::Commune;
pub use energy::{EnergyAccumulator, FlowDirection};
pub use metrics::{BillInputs, BillStatement, DerivedMetric, MetricValue};
pub use registry::AccumulatorRegistry;
pub use reset::{ResetScheduler, Transition};
pub use tariff::TariffConstants;
pub use tier::PowerTier;
