//! Typed simulation configuration and its validation.

use crate::{NormMode, PackageKind, PackageMap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for every resident decision modifier.
pub const MODIFIER_CEILING: f64 = 2.0;

/// Inclusive integer range used for uniform draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: u32,
    pub max: u32,
}

impl IntRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Width of the income-minus-cost window mapped onto [0,1] for affordability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffordabilityWindow {
    /// Window is `[-half_width, half_width]`.
    Fixed { half_width: f64 },
    /// Window is `±unit_price / divisor`, so it follows price drift.
    PriceShare { divisor: f64 },
}

/// Per-package economic parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Initial unit price in EUR.
    pub price: Decimal,
    /// Yearly price increase, drawn uniformly from this range.
    pub price_increase: IntRange,
    /// Chance that a household starts with the package installed.
    pub initial_adoption_chance: f64,
    /// Package weight applied to the subjective norm term.
    pub subj_norm_mod: f64,
    /// Payback time at which the ROI bonus reaches zero.
    pub roi_horizon_years: f64,
    pub affordability: AffordabilityWindow,
}

impl PackageConfig {
    /// Defaults for the given package kind.
    pub fn defaults_for(kind: PackageKind) -> Self {
        match kind {
            PackageKind::SolarPanel => Self {
                price: Decimal::new(410, 0),
                price_increase: IntRange::new(0, 20),
                initial_adoption_chance: 0.32,
                subj_norm_mod: 1.0,
                roi_horizon_years: 10.0,
                affordability: AffordabilityWindow::PriceShare { divisor: 3.0 },
            },
            PackageKind::HeatPump => Self {
                price: Decimal::new(6000, 0),
                price_increase: IntRange::new(0, 300),
                initial_adoption_chance: 0.07,
                subj_norm_mod: 0.75,
                roi_horizon_years: 30.0,
                affordability: AffordabilityWindow::Fixed { half_width: 1000.0 },
            },
        }
    }
}

/// Tariffs and emission factors shared by all packages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Electricity price in EUR/kWh.
    pub energy_price: Decimal,
    /// Gas price in EUR/m³.
    pub gas_price: Decimal,
    /// kg CO2 per kWh of grid electricity.
    pub co2_electricity: f64,
    /// kg CO2 per m³ of gas.
    pub co2_gas: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            energy_price: Decimal::new(32, 2),
            gas_price: Decimal::new(129, 2),
            co2_electricity: 0.33,
            co2_gas: 1.78,
        }
    }
}

/// Household energy profile draws and adoption rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdConfig {
    pub yearly_energy_usage: IntRange,
    pub yearly_gas_usage: IntRange,
    pub yearly_heatpump_usage: IntRange,
    pub solar_panel_amount_options: Vec<u32>,
    /// Yearly generation per panel in kWh.
    pub energy_generation_range: IntRange,
    /// Fraction of residents that must agree before a package is installed.
    pub decision_threshold: f64,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            yearly_energy_usage: IntRange::new(2000, 3500),
            yearly_gas_usage: IntRange::new(850, 1800),
            yearly_heatpump_usage: IntRange::new(2000, 2500),
            solar_panel_amount_options: vec![6, 8, 10],
            energy_generation_range: IntRange::new(298, 425),
            decision_threshold: 0.5,
        }
    }
}

/// Street packing bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetConfig {
    pub min_street_size: u32,
    pub max_street_size: u32,
    /// Chance that a street is drawn from the upper half of the size range.
    pub large_street_chance: f64,
}

impl Default for StreetConfig {
    fn default() -> Self {
        Self {
            min_street_size: 20,
            max_street_size: 60,
            large_street_chance: 0.2,
        }
    }
}

/// Fixed decision traits applied to every resident.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidentTraits {
    pub attitude: f64,
    pub attitude_mod: f64,
    pub subj_norm_mod: f64,
    pub behavioral_mod: f64,
}

/// Income distribution and decision parameters for residents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidentConfig {
    pub median_income: f64,
    /// Standard deviation of the underlying normal income model.
    pub sigma_normal: f64,
    /// Multipliers one of which is applied to income each undecided year.
    pub raise_income: Vec<Decimal>,
    pub decision_threshold: f64,
    /// Draw traits randomly when `None`.
    pub traits: Option<ResidentTraits>,
}

impl Default for ResidentConfig {
    fn default() -> Self {
        Self {
            median_income: 3300.0,
            sigma_normal: 700.0,
            raise_income: (100..=105).map(|p| Decimal::new(p, 2)).collect(),
            decision_threshold: 0.5,
            traits: None,
        }
    }
}

/// Immutable simulation configuration, validated once at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub nr_households: u32,
    pub nr_residents: u32,
    pub simulation_years: u32,
    /// Seed for the single deterministic RNG.
    pub seed: u64,
    /// Base subjective norm: initial value and Direct-mode reset value.
    pub subjective_norm: f64,
    pub norm_mode: NormMode,
    /// Maximum ROI bonus added to behavioral control.
    pub roi_bonus_cap: f64,
    pub energy: EnergyConfig,
    pub household: HouseholdConfig,
    pub streets: StreetConfig,
    pub resident: ResidentConfig,
    pub packages: PackageMap<PackageConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nr_households: 840,
            nr_residents: 1772,
            simulation_years: 30,
            seed: 42,
            subjective_norm: 0.0,
            norm_mode: NormMode::Street,
            roi_bonus_cap: 0.25,
            energy: EnergyConfig::default(),
            household: HouseholdConfig::default(),
            streets: StreetConfig::default(),
            resident: ResidentConfig::default(),
            packages: PackageMap::from_fn(PackageConfig::defaults_for),
        }
    }
}

impl SimConfig {
    /// Small population for quick runs and tests.
    pub fn testing() -> Self {
        Self {
            nr_households: 10,
            nr_residents: 10,
            ..Self::default()
        }
    }
}

/// Validation errors for configuration invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// At least one household is required.
    #[error("population needs at least one household")]
    NoHouseholds,
    /// Fewer residents than households would leave households empty.
    #[error("{residents} residents cannot fill {households} households")]
    PopulationMismatch { residents: u32, households: u32 },
    /// Value must be within [0, 1].
    #[error("{0} must be within [0,1]")]
    OutOfUnitInterval(&'static str),
    /// Numeric field must be finite.
    #[error("{0} is not finite")]
    NonFinite(&'static str),
    /// Price or cost must be non-negative.
    #[error("{0} must not be negative")]
    NegativeMoney(&'static str),
    /// Value must be strictly positive.
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
    /// Range minimum exceeds maximum.
    #[error("{0}: min exceeds max")]
    InvertedRange(&'static str),
    /// A list of options is empty.
    #[error("{0} must not be empty")]
    EmptyChoices(&'static str),
    /// Decision modifier outside [0, MODIFIER_CEILING].
    #[error("{0} must be within [0,2]")]
    ModifierOutOfRange(&'static str),
}

fn unit(v: f64, field: &'static str) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if !(0.0..=1.0).contains(&v) {
        return Err(ValidationError::OutOfUnitInterval(field));
    }
    Ok(())
}

fn positive(v: f64, field: &'static str) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if v <= 0.0 {
        return Err(ValidationError::NonPositive(field));
    }
    Ok(())
}

fn non_negative(v: f64, field: &'static str) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if v < 0.0 {
        return Err(ValidationError::NegativeMoney(field));
    }
    Ok(())
}

fn range(r: IntRange, field: &'static str) -> Result<(), ValidationError> {
    if r.min > r.max {
        return Err(ValidationError::InvertedRange(field));
    }
    Ok(())
}

fn modifier(v: f64, field: &'static str) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if !(0.0..=MODIFIER_CEILING).contains(&v) {
        return Err(ValidationError::ModifierOutOfRange(field));
    }
    Ok(())
}

/// Validate one package's parameters.
pub fn validate_package(p: &PackageConfig) -> Result<(), ValidationError> {
    if p.price < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney("package price"));
    }
    range(p.price_increase, "price_increase")?;
    unit(p.initial_adoption_chance, "initial_adoption_chance")?;
    non_negative(p.subj_norm_mod, "package subj_norm_mod")?;
    positive(p.roi_horizon_years, "roi_horizon_years")?;
    match p.affordability {
        AffordabilityWindow::Fixed { half_width } => positive(half_width, "affordability half_width"),
        AffordabilityWindow::PriceShare { divisor } => positive(divisor, "affordability divisor"),
    }
}

/// Validate resident income and decision parameters.
pub fn validate_resident(r: &ResidentConfig) -> Result<(), ValidationError> {
    positive(r.median_income, "median_income")?;
    non_negative(r.sigma_normal, "sigma_normal")?;
    unit(r.decision_threshold, "resident decision_threshold")?;
    if r.raise_income.is_empty() {
        return Err(ValidationError::EmptyChoices("raise_income"));
    }
    if r.raise_income.iter().any(|m| *m <= Decimal::ZERO) {
        return Err(ValidationError::NonPositive("raise_income"));
    }
    if let Some(t) = &r.traits {
        unit(t.attitude, "attitude")?;
        modifier(t.attitude_mod, "attitude_mod")?;
        modifier(t.subj_norm_mod, "subj_norm_mod")?;
        modifier(t.behavioral_mod, "behavioral_mod")?;
    }
    Ok(())
}

/// Validate household draws and the adoption threshold.
pub fn validate_household(h: &HouseholdConfig) -> Result<(), ValidationError> {
    range(h.yearly_energy_usage, "yearly_energy_usage")?;
    range(h.yearly_gas_usage, "yearly_gas_usage")?;
    range(h.yearly_heatpump_usage, "yearly_heatpump_usage")?;
    range(h.energy_generation_range, "energy_generation_range")?;
    if h.solar_panel_amount_options.is_empty() {
        return Err(ValidationError::EmptyChoices("solar_panel_amount_options"));
    }
    if h.solar_panel_amount_options.contains(&0) {
        return Err(ValidationError::NonPositive("solar_panel_amount_options"));
    }
    unit(h.decision_threshold, "household decision_threshold")
}

/// Validate the whole configuration. Called before any population is built.
pub fn validate_config(c: &SimConfig) -> Result<(), ValidationError> {
    if c.nr_households == 0 {
        return Err(ValidationError::NoHouseholds);
    }
    if c.nr_residents < c.nr_households {
        return Err(ValidationError::PopulationMismatch {
            residents: c.nr_residents,
            households: c.nr_households,
        });
    }
    unit(c.subjective_norm, "subjective_norm")?;
    non_negative(c.roi_bonus_cap, "roi_bonus_cap")?;

    if c.energy.energy_price < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney("energy_price"));
    }
    if c.energy.gas_price < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney("gas_price"));
    }
    non_negative(c.energy.co2_electricity, "co2_electricity")?;
    non_negative(c.energy.co2_gas, "co2_gas")?;

    validate_household(&c.household)?;

    if c.streets.min_street_size == 0 {
        return Err(ValidationError::NonPositive("min_street_size"));
    }
    if c.streets.min_street_size > c.streets.max_street_size {
        return Err(ValidationError::InvertedRange("street size"));
    }
    unit(c.streets.large_street_chance, "large_street_chance")?;

    validate_resident(&c.resident)?;
    for (_, p) in c.packages.iter() {
        validate_package(p)?;
    }
    Ok(())
}
