#![deny(warnings)]

//! Economic models for sustainability packages and resident income.
//!
//! This module provides:
//! - Yearly price drift per package
//! - Affordability and payback (ROI) terms of perceived behavioral control
//! - Yearly CO2 savings per household
//! - Log-normal income draws and discrete yearly raises
//!
//! Degenerate economics never fail: non-positive savings give an infinite
//! payback time and influence is clipped to [0,1].

use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sim_core::{AffordabilityWindow, EnergyConfig, HouseholdProfile, IntRange, PackageKind, SimConfig};
use std::f64::consts::PI;
use tracing::trace;

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// A sustainability package offered to the whole neighborhood.
///
/// One instance per [`PackageKind`]; its price only ever increases.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    kind: PackageKind,
    price: Decimal,
    price_increase: IntRange,
    subj_norm_mod: f64,
    roi_horizon_years: f64,
    roi_bonus_cap: f64,
    affordability: AffordabilityWindow,
    energy: EnergyConfig,
}

impl Package {
    /// Build the package of `kind` from a validated configuration.
    pub fn new(kind: PackageKind, config: &SimConfig) -> Self {
        let p = &config.packages[kind];
        Self {
            kind,
            price: p.price,
            price_increase: p.price_increase,
            subj_norm_mod: p.subj_norm_mod,
            roi_horizon_years: p.roi_horizon_years,
            roi_bonus_cap: config.roi_bonus_cap,
            affordability: p.affordability,
            energy: config.energy.clone(),
        }
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Current unit price in EUR.
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Package weight applied to the subjective norm term of a decision.
    pub fn subj_norm_mod(&self) -> f64 {
        self.subj_norm_mod
    }

    /// Advance one year: price grows by a uniform integer from the configured
    /// increase range, holding at the `Decimal` ceiling. Returns the applied
    /// increase.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Decimal {
        let IntRange { min, max } = self.price_increase;
        let inc = Decimal::from(rng.gen_range(min..=max));
        let before = self.price;
        self.price = before.checked_add(inc).unwrap_or(Decimal::MAX);
        self.price - before
    }

    /// Installation cost for the household: one unit per panel for solar,
    /// a single unit for a heat pump.
    pub fn total_cost(&self, household: &HouseholdProfile) -> f64 {
        let unit = to_f64(self.price);
        match self.kind {
            PackageKind::SolarPanel => unit * f64::from(household.panel_count),
            PackageKind::HeatPump => unit,
        }
    }

    /// Electricity a heat pump would draw from the grid, after any installed
    /// solar generation.
    fn heat_pump_grid_kwh(household: &HouseholdProfile) -> f64 {
        if household.installed[PackageKind::SolarPanel] {
            (household.heat_pump_usage_kwh - household.solar_generation_kwh()).max(0.0)
        } else {
            household.heat_pump_usage_kwh
        }
    }

    /// Yearly monetary savings in EUR once installed.
    pub fn annual_savings(&self, household: &HouseholdProfile) -> f64 {
        let energy_price = to_f64(self.energy.energy_price);
        match self.kind {
            PackageKind::SolarPanel => household.solar_generation_kwh() * energy_price,
            PackageKind::HeatPump => {
                let gas_cost = household.gas_usage_m3 * to_f64(self.energy.gas_price);
                gas_cost - Self::heat_pump_grid_kwh(household) * energy_price
            }
        }
    }

    /// Payback time in years. `f64::INFINITY` when savings are not positive.
    pub fn roi(&self, household: &HouseholdProfile) -> f64 {
        let savings = self.annual_savings(household);
        if savings <= 0.0 {
            return f64::INFINITY;
        }
        self.total_cost(household) / savings
    }

    /// Bonus that decays linearly from the cap at zero payback to nothing at
    /// the package's horizon.
    pub fn roi_bonus(&self, roi_years: f64) -> f64 {
        let bonus = self.roi_bonus_cap * (1.0 - roi_years / self.roi_horizon_years);
        bonus.clamp(0.0, self.roi_bonus_cap)
    }

    /// Income minus cost, rescaled from the affordability window to [0,1].
    /// Not clipped.
    pub fn affordability(&self, income: f64, household: &HouseholdProfile) -> f64 {
        let half_width = match self.affordability {
            AffordabilityWindow::Fixed { half_width } => half_width,
            AffordabilityWindow::PriceShare { divisor } => to_f64(self.price) / divisor,
        };
        if half_width <= 0.0 {
            return 0.0;
        }
        let difference = income - self.total_cost(household);
        (difference + half_width) / (2.0 * half_width)
    }

    /// Perceived behavioral control in [0,1]: affordability plus ROI bonus.
    pub fn behavioral_influence(&self, income: Decimal, household: &HouseholdProfile) -> f64 {
        let afford = self.affordability(to_f64(income), household);
        let roi = self.roi(household);
        let influence = (afford + self.roi_bonus(roi)).clamp(0.0, 1.0);
        trace!(package = %self.kind, afford, roi, influence, "behavioral influence");
        influence
    }

    /// Yearly kg CO2 avoided by this package in the household.
    pub fn co2_savings(&self, household: &HouseholdProfile) -> f64 {
        match self.kind {
            PackageKind::SolarPanel => household.solar_generation_kwh() * self.energy.co2_electricity,
            PackageKind::HeatPump => {
                household.gas_usage_m3 * self.energy.co2_gas
                    - Self::heat_pump_grid_kwh(household) * self.energy.co2_electricity
            }
        }
    }
}

/// Yearly kg CO2 of a household before any package is installed.
pub fn baseline_emissions(household: &HouseholdProfile, energy: &EnergyConfig) -> f64 {
    household.energy_usage_kwh * energy.co2_electricity + household.gas_usage_m3 * energy.co2_gas
}

/// Standard normal sample via the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // (0, 1] keeps ln finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Log-normal parameters `(mu, sigma)` matching a median and the standard
/// deviation of a normal income model.
pub fn lognormal_params(median: f64, sigma_normal: f64) -> (f64, f64) {
    let mu = median.ln();
    let sigma = (1.0 + (sigma_normal / median).powi(2)).ln().sqrt();
    (mu, sigma)
}

/// Draw an initial income: log-normal, floored at zero, rounded to the
/// nearest hundred.
pub fn draw_income<R: Rng + ?Sized>(rng: &mut R, median: f64, sigma_normal: f64) -> Decimal {
    let (mu, sigma) = lognormal_params(median, sigma_normal);
    let salary = (mu + sigma * standard_normal(rng)).exp().max(0.0);
    let d = Decimal::from_f64(salary).unwrap_or(Decimal::ZERO);
    (d / Decimal::ONE_HUNDRED).round() * Decimal::ONE_HUNDRED
}

/// Apply a raise multiplier, rounding to the nearest ten. Income stays put
/// once a raise would overflow `Decimal`.
pub fn raised_income(income: Decimal, multiplier: Decimal) -> Decimal {
    income
        .checked_mul(multiplier)
        .and_then(|raised| (raised / Decimal::TEN).round().checked_mul(Decimal::TEN))
        .unwrap_or(income)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn household(solar_installed: bool) -> HouseholdProfile {
        HouseholdProfile {
            panel_count: 8,
            generation_per_panel_kwh: 350.0,
            energy_usage_kwh: 2500.0,
            gas_usage_m3: 1000.0,
            heat_pump_usage_kwh: 2200.0,
            installed: sim_core::PackageMap {
                solar_panel: solar_installed,
                heat_pump: false,
            },
        }
    }

    fn package(kind: PackageKind) -> Package {
        Package::new(kind, &SimConfig::default())
    }

    #[test]
    fn solar_roi_matches_worked_example() {
        let solar = package(PackageKind::SolarPanel);
        let h = household(false);
        assert!((solar.annual_savings(&h) - 896.0).abs() < 1e-9);
        assert!((solar.total_cost(&h) - 3280.0).abs() < 1e-9);
        let roi = solar.roi(&h);
        assert!((roi - 3280.0 / 896.0).abs() < 1e-9);
        let bonus = solar.roi_bonus(roi);
        assert!((bonus - (0.25 - 0.025 * roi)).abs() < 1e-9);
        assert!((bonus - 0.158).abs() < 1e-3);
    }

    #[test]
    fn solar_influence_combines_affordability_and_bonus() {
        let solar = package(PackageKind::SolarPanel);
        let h = household(false);
        // window is ±410/3, difference is 3300 - 3280
        let half = 410.0 / 3.0;
        let expected = (20.0 + half) / (2.0 * half) + solar.roi_bonus(solar.roi(&h));
        let got = solar.behavioral_influence(Decimal::new(3300, 0), &h);
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn heat_pump_roi_uses_solar_offset() {
        let hp = package(PackageKind::HeatPump);
        let without = hp.roi(&household(false));
        let with = hp.roi(&household(true));
        assert!((without - 6000.0 / (1290.0 - 704.0)).abs() < 1e-9);
        assert!((with - 6000.0 / 1290.0).abs() < 1e-9);
        assert!(with < without);
    }

    #[test]
    fn heat_pump_co2_accounts_for_solar() {
        let hp = package(PackageKind::HeatPump);
        assert!((hp.co2_savings(&household(false)) - (1780.0 - 2200.0 * 0.33)).abs() < 1e-9);
        assert!((hp.co2_savings(&household(true)) - 1780.0).abs() < 1e-9);
        let solar = package(PackageKind::SolarPanel);
        assert!((solar.co2_savings(&household(false)) - 2800.0 * 0.33).abs() < 1e-9);
    }

    #[test]
    fn non_positive_savings_give_infinite_roi_and_no_bonus() {
        let mut config = SimConfig::default();
        config.energy.energy_price = Decimal::ZERO;
        let solar = Package::new(PackageKind::SolarPanel, &config);
        let roi = solar.roi(&household(false));
        assert!(roi.is_infinite());
        assert_eq!(solar.roi_bonus(roi), 0.0);
    }

    #[test]
    fn price_step_is_seeded() {
        let mut a = package(PackageKind::HeatPump);
        let mut b = package(PackageKind::HeatPump);
        let mut r1 = ChaCha8Rng::seed_from_u64(7);
        let mut r2 = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..10 {
            a.step(&mut r1);
            b.step(&mut r2);
        }
        assert_eq!(a.price(), b.price());
        assert!(a.price() >= Decimal::new(6000, 0));
    }

    #[test]
    fn price_holds_at_decimal_ceiling() {
        let mut config = SimConfig::default();
        config.packages[PackageKind::SolarPanel].price = Decimal::MAX - Decimal::from(5);
        config.packages[PackageKind::SolarPanel].price_increase = IntRange::new(10, 20);
        let mut solar = Package::new(PackageKind::SolarPanel, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(solar.step(&mut rng), Decimal::from(5));
        assert_eq!(solar.price(), Decimal::MAX);
        solar.step(&mut rng);
        assert_eq!(solar.price(), Decimal::MAX);
    }

    #[test]
    fn income_rounds_to_hundreds_and_tens() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let income = draw_income(&mut rng, 3300.0, 700.0);
            assert!(income >= Decimal::ZERO);
            assert_eq!(income % Decimal::ONE_HUNDRED, Decimal::ZERO);
        }
        assert_eq!(
            raised_income(Decimal::new(3300, 0), Decimal::new(103, 2)),
            Decimal::new(3400, 0)
        );
        assert_eq!(
            raised_income(Decimal::new(3400, 0), Decimal::new(101, 2)),
            Decimal::new(3430, 0)
        );
    }

    #[test]
    fn raise_saturates_instead_of_overflowing() {
        let ten = Decimal::TEN;
        assert_eq!(raised_income(Decimal::MAX, ten), Decimal::MAX);
        assert_eq!(raised_income(Decimal::MAX, Decimal::new(105, 2)), Decimal::MAX);
        let mut income = Decimal::new(3300, 0);
        for _ in 0..60 {
            let next = raised_income(income, ten);
            assert!(next >= income);
            income = next;
        }
    }

    #[test]
    fn lognormal_median_is_preserved() {
        let (mu, sigma) = lognormal_params(3300.0, 700.0);
        assert!((mu.exp() - 3300.0).abs() < 1e-6);
        assert!(sigma > 0.0 && sigma < 1.0);
    }

    proptest! {
        #[test]
        fn price_is_non_decreasing(seed in any::<u64>(), years in 1usize..60) {
            let mut p = package(PackageKind::SolarPanel);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut last = p.price();
            for _ in 0..years {
                p.step(&mut rng);
                prop_assert!(p.price() >= last);
                last = p.price();
            }
        }

        #[test]
        fn influence_stays_in_unit_interval(income in 0i64..50_000,
                                            panels in 1u32..20,
                                            generation in 0.0f64..600.0,
                                            gas in 0.0f64..3000.0,
                                            solar in any::<bool>()) {
            let mut h = household(solar);
            h.panel_count = panels;
            h.generation_per_panel_kwh = generation;
            h.gas_usage_m3 = gas;
            for kind in PackageKind::ALL {
                let v = package(kind).behavioral_influence(Decimal::new(income, 0), &h);
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }

        #[test]
        fn bonus_never_exceeds_cap(roi in 0.0f64..100.0) {
            let p = package(PackageKind::HeatPump);
            let b = p.roi_bonus(roi);
            prop_assert!((0.0..=0.25).contains(&b));
        }
    }
}
