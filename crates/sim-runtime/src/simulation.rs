//! Year-stepped scheduler owning the population, streets and packages.

use crate::diffusion::diffuse;
use crate::household::Household;
use crate::streets::{build_streets, Street};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use sim_ai::DecisionTally;
use sim_core::{
    validate_config, HouseholdId, HouseholdRecord, PackageKind, PackageMap, SimConfig,
    ValidationError, YearSnapshot,
};
use sim_econ::Package;
use std::fmt;
use tracing::info;

/// A whole simulated neighborhood.
///
/// Every random draw goes through one ChaCha generator seeded from the
/// config, so the same config reproduces the same history.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimConfig,
    rng: ChaCha8Rng,
    packages: PackageMap<Package>,
    households: Vec<Household>,
    streets: Vec<Street>,
    tally: DecisionTally,
    history: Vec<YearSnapshot>,
    year: u32,
}

impl Simulation {
    /// Validate the config and build the population.
    ///
    /// Residents are spread evenly; the first `nr_residents % nr_households`
    /// households get one extra. Streets are packed after all households are
    /// drawn, then one diffusion pass seeds the year-1 norms.
    pub fn create(config: SimConfig) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let packages = PackageMap::from_fn(|k| Package::new(k, &config));

        let n = config.nr_households as usize;
        let per_household = config.nr_residents as usize / n;
        let remainder = config.nr_residents as usize % n;
        let mut households = Vec::with_capacity(n);
        let mut next_resident = 0;
        for i in 0..n {
            let mut h = Household::draw(HouseholdId(i), &config, &packages, &mut rng);
            let count = per_household + usize::from(i < remainder);
            next_resident = h.add_residents(next_resident, count, &packages, &config, &mut rng);
            households.push(h);
        }

        let streets = build_streets(n, &config.streets, &mut rng);
        for s in &streets {
            for id in &s.households {
                households[id.0].set_street(s.id);
            }
        }
        diffuse(config.norm_mode, config.subjective_norm, &mut households, &streets);

        let sim = Self {
            config,
            rng,
            packages,
            households,
            streets,
            tally: DecisionTally::default(),
            history: Vec::new(),
            year: 0,
        };
        info!(
            households = sim.households.len(),
            residents = next_resident,
            streets = sim.streets.len(),
            mode = ?sim.config.norm_mode,
            "population created"
        );
        Ok(sim)
    }

    /// Advance one year: residents and households, then diffusion, then
    /// price drift.
    pub fn step(&mut self) {
        self.tally = DecisionTally::default();
        for h in &mut self.households {
            h.step(
                &self.packages,
                &self.config.resident.raise_income,
                &mut self.tally,
                &mut self.rng,
            );
        }
        diffuse(
            self.config.norm_mode,
            self.config.subjective_norm,
            &mut self.households,
            &self.streets,
        );
        for kind in PackageKind::ALL {
            self.packages[kind].step(&mut self.rng);
        }
        self.year += 1;
    }

    /// Start-of-year half of a snapshot: prices and installed counts before
    /// stepping.
    pub fn snapshot_start_of_year(&self, year: u32) -> YearSnapshot {
        YearSnapshot {
            year,
            prices_start: self.prices(),
            installed_start: self.installed_counts(),
            ..YearSnapshot::default()
        }
    }

    /// Complete a snapshot after stepping and append it to the history.
    pub fn snapshot_end_of_year(&mut self, snapshot: &mut YearSnapshot) {
        snapshot.decisions = self.tally;
        snapshot.residents_decided = self.decided_counts();
        snapshot.installed = self.installed_counts();
        snapshot.prices = self.prices();
        snapshot.co2_emissions_kg = self.households.iter().map(Household::co2_emissions_kg).sum();
        snapshot.co2_saved_kg = self.households.iter().map(Household::co2_saved_kg).sum();
        self.history.push(snapshot.clone());
    }

    /// Snapshot, step and snapshot one year.
    pub fn run_year(&mut self) -> YearSnapshot {
        let mut snapshot = self.snapshot_start_of_year(self.year + 1);
        self.step();
        self.snapshot_end_of_year(&mut snapshot);
        info!(
            year = snapshot.year,
            solar_decisions = snapshot.decisions.solar_panel,
            heat_pump_decisions = snapshot.decisions.heat_pump,
            solar_installed = snapshot.installed.solar_panel,
            heat_pump_installed = snapshot.installed.heat_pump,
            solar_price = %snapshot.prices.solar_panel,
            heat_pump_price = %snapshot.prices.heat_pump,
            "year complete"
        );
        snapshot
    }

    pub fn household_report(&self) -> Vec<HouseholdRecord> {
        self.households.iter().map(Household::record).collect()
    }

    pub fn history(&self) -> &[YearSnapshot] {
        &self.history
    }

    pub fn years_completed(&self) -> u32 {
        self.year
    }

    /// True once the configured number of years has been stepped.
    pub fn is_finished(&self) -> bool {
        self.year >= self.config.simulation_years
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn packages(&self) -> &PackageMap<Package> {
        &self.packages
    }

    pub fn households(&self) -> &[Household] {
        &self.households
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn prices(&self) -> PackageMap<Decimal> {
        self.packages.map(|_, p| p.price())
    }

    /// Households with each package installed.
    pub fn installed_counts(&self) -> PackageMap<u32> {
        PackageMap::from_fn(|kind| {
            self.households.iter().filter(|h| h.is_installed(kind)).count() as u32
        })
    }

    /// Residents who have decided for each package.
    pub fn decided_counts(&self) -> PackageMap<u32> {
        PackageMap::from_fn(|kind| {
            self.households
                .iter()
                .flat_map(Household::residents)
                .filter(|r| r.has_decided(kind))
                .count() as u32
        })
    }

    pub fn summary(&self) -> PopulationSummary {
        PopulationSummary {
            year: self.year,
            households: self.households.len(),
            residents: self.households.iter().map(|h| h.residents().len()).sum(),
            residents_decided: self.decided_counts(),
            households_installed: self.installed_counts(),
            prices: self.prices(),
        }
    }
}

/// Population-wide adoption state at a point in the run.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationSummary {
    pub year: u32,
    pub households: usize,
    pub residents: usize,
    pub residents_decided: PackageMap<u32>,
    pub households_installed: PackageMap<u32>,
    pub prices: PackageMap<Decimal>,
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "year {}: {} households, {} residents",
            self.year, self.households, self.residents
        )?;
        for kind in PackageKind::ALL {
            write!(
                f,
                "; {}: {} decided, {} installed, price {}",
                kind,
                self.residents_decided[kind],
                self.households_installed[kind],
                self.prices[kind]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residents_spread_with_remainder_first() {
        let mut config = SimConfig::testing();
        config.nr_households = 4;
        config.nr_residents = 10;
        let sim = Simulation::create(config).expect("valid config");
        let sizes: Vec<_> = sim.households().iter().map(|h| h.residents().len()).collect();
        assert_eq!(sizes, [3, 3, 2, 2]);
        let ids: Vec<_> = sim
            .households()
            .iter()
            .flat_map(|h| h.residents().iter().map(|r| r.id().0))
            .collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn households_know_their_street() {
        let mut config = SimConfig::testing();
        config.nr_households = 120;
        config.nr_residents = 240;
        let sim = Simulation::create(config).expect("valid config");
        for s in sim.streets() {
            for id in &s.households {
                assert_eq!(sim.households()[id.0].street(), s.id);
            }
        }
    }

    #[test]
    fn run_year_records_history() {
        let mut sim = Simulation::create(SimConfig::testing()).expect("valid config");
        let installed_before = sim.installed_counts();
        let first = sim.run_year();
        assert_eq!(first.year, 1);
        assert_eq!(first.installed_start, installed_before);
        let second = sim.run_year();
        assert_eq!(second.year, 2);
        assert_eq!(sim.history(), &[first.clone(), second.clone()]);
        assert_eq!(second.prices_start, first.prices);
        assert_eq!(sim.years_completed(), 2);
    }

    #[test]
    fn co2_totals_balance() {
        let mut sim = Simulation::create(SimConfig::default()).expect("valid config");
        let snap = sim.run_year();
        let baseline: f64 = sim
            .households()
            .iter()
            .map(|h| sim_econ::baseline_emissions(h.profile(), &sim.config().energy))
            .sum();
        assert!((snap.co2_emissions_kg + snap.co2_saved_kg - baseline).abs() < 1e-6 * baseline);
    }

    #[test]
    fn summary_displays_every_package() {
        let sim = Simulation::create(SimConfig::testing()).expect("valid config");
        let text = sim.summary().to_string();
        assert!(text.starts_with("year 0: 10 households, 10 residents"));
        assert!(text.contains("Solar Panel"));
        assert!(text.contains("Heat Pump"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::testing();
        config.nr_households = 0;
        assert_eq!(
            Simulation::create(config).err(),
            Some(ValidationError::NoHouseholds)
        );
    }
}
