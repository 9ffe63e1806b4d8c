//! Households: aggregate resident decisions into package installations.

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use sim_ai::{DecisionTally, Resident};
use sim_core::{
    HouseholdId, HouseholdProfile, HouseholdRecord, IntRange, PackageKind, PackageMap,
    ResidentId, SimConfig, StreetId,
};
use sim_econ::{baseline_emissions, Package};
use tracing::debug;

fn draw<R: Rng + ?Sized>(rng: &mut R, r: IntRange) -> f64 {
    f64::from(rng.gen_range(r.min..=r.max))
}

/// A household and the residents it owns.
#[derive(Clone, Debug, PartialEq)]
pub struct Household {
    id: HouseholdId,
    street: StreetId,
    profile: HouseholdProfile,
    residents: Vec<Resident>,
    decision_threshold: f64,
    pub(crate) skip_prev: PackageMap<bool>,
    pub(crate) skip_next: PackageMap<bool>,
    co2_emissions_kg: f64,
    co2_saved_kg: f64,
}

impl Household {
    /// Household with the given profile and no residents. Packages marked
    /// installed in `profile` are not accounted for in the CO2 totals; use
    /// [`Household::install`] for that.
    pub fn new(id: HouseholdId, profile: HouseholdProfile, config: &SimConfig) -> Self {
        let co2_emissions_kg = baseline_emissions(&profile, &config.energy);
        Self {
            id,
            street: StreetId(0),
            profile,
            residents: Vec::new(),
            decision_threshold: config.household.decision_threshold,
            skip_prev: PackageMap::default(),
            skip_next: PackageMap::default(),
            co2_emissions_kg,
            co2_saved_kg: 0.0,
        }
    }

    /// Draw an energy profile and initial installations.
    pub fn draw<R: Rng + ?Sized>(
        id: HouseholdId,
        config: &SimConfig,
        packages: &PackageMap<Package>,
        rng: &mut R,
    ) -> Self {
        let hc = &config.household;
        let panel_count = hc.solar_panel_amount_options.choose(rng).copied().unwrap_or(0);
        let profile = HouseholdProfile {
            panel_count,
            generation_per_panel_kwh: draw(rng, hc.energy_generation_range),
            energy_usage_kwh: draw(rng, hc.yearly_energy_usage),
            gas_usage_m3: draw(rng, hc.yearly_gas_usage),
            heat_pump_usage_kwh: draw(rng, hc.yearly_heatpump_usage),
            installed: PackageMap::default(),
        };
        let mut household = Self::new(id, profile, config);
        for kind in PackageKind::ALL {
            if rng.gen_bool(config.packages[kind].initial_adoption_chance) {
                household.install(&packages[kind]);
            }
        }
        household
    }

    /// Create `count` residents numbered from `first_id`. Returns the next
    /// free resident id.
    pub fn add_residents<R: Rng + ?Sized>(
        &mut self,
        first_id: usize,
        count: usize,
        packages: &PackageMap<Package>,
        config: &SimConfig,
        rng: &mut R,
    ) -> usize {
        for n in first_id..first_id + count {
            let resident = Resident::new(ResidentId(n), self.id, &self.profile, packages, config, rng);
            self.residents.push(resident);
        }
        first_id + count
    }

    /// Add an existing resident. It inherits every package already installed.
    pub fn push_resident(&mut self, mut resident: Resident) {
        for kind in PackageKind::ALL {
            if self.profile.installed[kind] {
                resident.adopt(kind);
            }
        }
        self.residents.push(resident);
    }

    /// Install a package. Returns `false` if it was already installed.
    ///
    /// CO2 savings are evaluated before the flag flips, so a heat pump sees
    /// solar installed earlier but not itself.
    pub fn install(&mut self, package: &Package) -> bool {
        let kind = package.kind();
        if self.profile.installed[kind] {
            return false;
        }
        let saved = package.co2_savings(&self.profile);
        self.profile.installed[kind] = true;
        self.co2_emissions_kg -= saved;
        self.co2_saved_kg += saved;
        debug!(household = self.id.0, package = %kind, saved, "package installed");
        true
    }

    /// Share of residents who decided for the package. Zero for an empty
    /// household.
    pub fn adoption_fraction(&self, kind: PackageKind) -> f64 {
        if self.residents.is_empty() {
            return 0.0;
        }
        let decided = self.residents.iter().filter(|r| r.has_decided(kind)).count();
        decided as f64 / self.residents.len() as f64
    }

    /// Step every resident, then install each package whose adoption
    /// fraction reaches the household threshold.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        packages: &PackageMap<Package>,
        raise_income: &[Decimal],
        tally: &mut DecisionTally,
        rng: &mut R,
    ) {
        for resident in &mut self.residents {
            resident.step(&self.profile, packages, raise_income, tally, rng);
        }
        self.aggregate(packages);
    }

    /// Install every package whose adoption fraction reaches the threshold.
    /// A household without residents has nobody to vote and never installs.
    pub(crate) fn aggregate(&mut self, packages: &PackageMap<Package>) {
        if self.residents.is_empty() {
            return;
        }
        for kind in PackageKind::ALL {
            if !self.profile.installed[kind]
                && self.adoption_fraction(kind) >= self.decision_threshold
            {
                self.install(&packages[kind]);
            }
        }
    }

    pub fn id(&self) -> HouseholdId {
        self.id
    }

    pub fn street(&self) -> StreetId {
        self.street
    }

    pub(crate) fn set_street(&mut self, street: StreetId) {
        self.street = street;
    }

    pub fn profile(&self) -> &HouseholdProfile {
        &self.profile
    }

    pub fn is_installed(&self, kind: PackageKind) -> bool {
        self.profile.installed[kind]
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    pub(crate) fn residents_mut(&mut self) -> &mut [Resident] {
        &mut self.residents
    }

    /// Yearly emissions after installed packages, in kg CO2.
    pub fn co2_emissions_kg(&self) -> f64 {
        self.co2_emissions_kg
    }

    /// Yearly savings of installed packages, in kg CO2.
    pub fn co2_saved_kg(&self) -> f64 {
        self.co2_saved_kg
    }

    pub fn record(&self) -> HouseholdRecord {
        HouseholdRecord {
            id: self.id,
            street: self.street,
            profile: self.profile.clone(),
            co2_emissions_kg: self.co2_emissions_kg,
            co2_saved_kg: self.co2_saved_kg,
            residents: self.residents.iter().map(Resident::record).collect(),
        }
    }
}
