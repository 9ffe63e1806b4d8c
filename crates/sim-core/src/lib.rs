#![deny(warnings)]

//! Core domain models and invariants for the neighborhood adoption simulation.
//!
//! This crate defines the serializable types shared by every other crate:
//! the validated configuration record, the closed set of sustainability
//! packages, household energy profiles, and the per-year snapshot and
//! household report records handed to callers.

mod config;

pub use config::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Index of a household in the owning population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HouseholdId(pub usize);

/// Global resident number, unique across the population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResidentId(pub usize);

/// Index of a street in the street partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreetId(pub usize);

/// The fixed set of sustainability packages a household can adopt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PackageKind {
    /// Rooftop photovoltaic panels.
    SolarPanel,
    /// Electric heat pump replacing gas heating.
    HeatPump,
}

impl PackageKind {
    /// All package kinds in evaluation order. Solar comes first so that heat
    /// pump economics installed in the same step see the solar offset.
    pub const ALL: [PackageKind; 2] = [PackageKind::SolarPanel, PackageKind::HeatPump];

    /// Human-readable package name.
    pub fn name(self) -> &'static str {
        match self {
            PackageKind::SolarPanel => "Solar Panel",
            PackageKind::HeatPump => "Heat Pump",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per package kind. Replaces name-keyed dictionaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMap<T> {
    /// Value for [`PackageKind::SolarPanel`].
    pub solar_panel: T,
    /// Value for [`PackageKind::HeatPump`].
    pub heat_pump: T,
}

impl<T> PackageMap<T> {
    /// Build a map by evaluating `f` for every package kind, in [`PackageKind::ALL`] order.
    pub fn from_fn(mut f: impl FnMut(PackageKind) -> T) -> Self {
        let solar_panel = f(PackageKind::SolarPanel);
        let heat_pump = f(PackageKind::HeatPump);
        Self {
            solar_panel,
            heat_pump,
        }
    }

    /// Map every value, keeping the package association.
    pub fn map<U>(&self, mut f: impl FnMut(PackageKind, &T) -> U) -> PackageMap<U> {
        PackageMap::from_fn(|kind| f(kind, &self[kind]))
    }

    /// Iterate `(kind, value)` pairs in [`PackageKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (PackageKind, &T)> {
        PackageKind::ALL.into_iter().map(move |kind| (kind, &self[kind]))
    }
}

impl<T: Clone> PackageMap<T> {
    /// Same value for every package.
    pub fn splat(value: T) -> Self {
        Self {
            solar_panel: value.clone(),
            heat_pump: value,
        }
    }
}

impl<T> Index<PackageKind> for PackageMap<T> {
    type Output = T;

    fn index(&self, kind: PackageKind) -> &T {
        match kind {
            PackageKind::SolarPanel => &self.solar_panel,
            PackageKind::HeatPump => &self.heat_pump,
        }
    }
}

impl<T> IndexMut<PackageKind> for PackageMap<T> {
    fn index_mut(&mut self, kind: PackageKind) -> &mut T {
        match kind {
            PackageKind::SolarPanel => &mut self.solar_panel,
            PackageKind::HeatPump => &mut self.heat_pump,
        }
    }
}

/// Spatial granularity of social influence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormMode {
    /// Adoption rate across the whole neighborhood.
    District,
    /// Adoption rate within the household's own street.
    #[default]
    Street,
    /// Immediate neighbors in street order.
    Direct,
}

impl FromStr for NormMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "district" => Ok(NormMode::District),
            "street" => Ok(NormMode::Street),
            "direct" => Ok(NormMode::Direct),
            other => Err(format!("unknown norm mode: {other}")),
        }
    }
}

/// Energy characteristics of a household that package economics depend on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HouseholdProfile {
    /// Number of solar panels the household would install.
    pub panel_count: u32,
    /// Yearly generation per panel in kWh.
    pub generation_per_panel_kwh: f64,
    /// Yearly electricity usage in kWh.
    pub energy_usage_kwh: f64,
    /// Yearly gas usage in m³.
    pub gas_usage_m3: f64,
    /// Yearly electricity a heat pump would use in kWh.
    pub heat_pump_usage_kwh: f64,
    /// Installed packages. Monotonic: never reset once true.
    pub installed: PackageMap<bool>,
}

impl HouseholdProfile {
    /// Total yearly solar generation for the household's panel count.
    pub fn solar_generation_kwh(&self) -> f64 {
        self.generation_per_panel_kwh * f64::from(self.panel_count)
    }
}

/// Aggregate state of one simulated year.
///
/// Start-of-year fields are filled by the scheduler before stepping, the rest
/// after the step completes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct YearSnapshot {
    /// One-based year number.
    pub year: u32,
    /// Package prices before the step.
    pub prices_start: PackageMap<Decimal>,
    /// Households with each package installed before the step.
    pub installed_start: PackageMap<u32>,
    /// Residents who decided for each package during this year.
    pub decisions: PackageMap<u32>,
    /// Residents who have decided for each package, cumulative.
    pub residents_decided: PackageMap<u32>,
    /// Households with each package installed after the step.
    pub installed: PackageMap<u32>,
    /// Package prices after the step's price drift.
    pub prices: PackageMap<Decimal>,
    /// Population-wide yearly emissions in kg CO2 after the step.
    pub co2_emissions_kg: f64,
    /// Population-wide yearly savings in kg CO2 after the step.
    pub co2_saved_kg: f64,
}

/// Per-resident entry in a household report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidentRecord {
    pub id: ResidentId,
    pub household: HouseholdId,
    pub income: Decimal,
    pub attitude: f64,
    pub attitude_mod: f64,
    pub subj_norm_mod: f64,
    pub behavioral_mod: f64,
    pub subjective_norm: PackageMap<f64>,
    pub behavioral_control: PackageMap<f64>,
    pub decisions: PackageMap<bool>,
}

/// Household state handed to callers after (or during) a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HouseholdRecord {
    pub id: HouseholdId,
    pub street: StreetId,
    pub profile: HouseholdProfile,
    pub co2_emissions_kg: f64,
    pub co2_saved_kg: f64,
    pub residents: Vec<ResidentRecord>,
}
