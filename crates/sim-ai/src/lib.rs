#![deny(warnings)]

//! Resident decision model based on the Theory of Planned Behavior.
//!
//! Each resident scores every package it has not yet decided on from three
//! weighted terms: attitude, subjective norm (social pressure, written by the
//! diffusion pass) and perceived behavioral control (affordability and
//! payback). A score above the resident's threshold is a one-way decision.

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{
    HouseholdId, HouseholdProfile, PackageKind, PackageMap, ResidentId, ResidentRecord,
    ResidentTraits, SimConfig, MODIFIER_CEILING,
};
use sim_econ::{draw_income, raised_income, Package};
use tracing::trace;

/// Maximum attainable weighted sum of the three decision terms.
pub const SCORE_NORMALIZER: f64 = 3.0 * MODIFIER_CEILING;

/// Residents who decided for each package during the current step.
pub type DecisionTally = PackageMap<u32>;

/// Normalized decision score for one package.
pub fn decision_score(
    traits: &ResidentTraits,
    subjective_norm: f64,
    package_norm_mod: f64,
    behavioral_control: f64,
) -> f64 {
    (traits.attitude * traits.attitude_mod
        + subjective_norm * package_norm_mod * traits.subj_norm_mod
        + behavioral_control * traits.behavioral_mod)
        / SCORE_NORMALIZER
}

fn random_traits<R: Rng + ?Sized>(rng: &mut R) -> ResidentTraits {
    ResidentTraits {
        attitude: rng.gen_range(0.0..=1.0),
        attitude_mod: rng.gen_range(0.0..=MODIFIER_CEILING),
        subj_norm_mod: rng.gen_range(0.0..=MODIFIER_CEILING),
        behavioral_mod: rng.gen_range(0.0..=MODIFIER_CEILING),
    }
}

/// A resident of a household.
#[derive(Clone, Debug, PartialEq)]
pub struct Resident {
    id: ResidentId,
    household: HouseholdId,
    income: Decimal,
    traits: ResidentTraits,
    decision_threshold: f64,
    decisions: PackageMap<bool>,
    subjective_norm: PackageMap<f64>,
    behavioral_control: PackageMap<f64>,
}

impl Resident {
    /// Create a resident for a household. Packages already installed in the
    /// household count as decided.
    pub fn new<R: Rng + ?Sized>(
        id: ResidentId,
        household: HouseholdId,
        profile: &HouseholdProfile,
        packages: &PackageMap<Package>,
        config: &SimConfig,
        rng: &mut R,
    ) -> Self {
        let rc = &config.resident;
        let income = draw_income(rng, rc.median_income, rc.sigma_normal);
        let traits = match rc.traits {
            Some(t) => t,
            None => random_traits(rng),
        };
        let behavioral_control =
            packages.map(|_, p| p.behavioral_influence(income, profile));
        Self {
            id,
            household,
            income,
            traits,
            decision_threshold: rc.decision_threshold,
            decisions: profile.installed,
            subjective_norm: PackageMap::splat(config.subjective_norm),
            behavioral_control,
        }
    }

    pub fn id(&self) -> ResidentId {
        self.id
    }

    pub fn household(&self) -> HouseholdId {
        self.household
    }

    pub fn income(&self) -> Decimal {
        self.income
    }

    pub fn traits(&self) -> &ResidentTraits {
        &self.traits
    }

    pub fn has_decided(&self, kind: PackageKind) -> bool {
        self.decisions[kind]
    }

    pub fn decisions(&self) -> &PackageMap<bool> {
        &self.decisions
    }

    pub fn subjective_norm(&self, kind: PackageKind) -> f64 {
        self.subjective_norm[kind]
    }

    pub fn behavioral_control(&self, kind: PackageKind) -> f64 {
        self.behavioral_control[kind]
    }

    /// Overwrite the cached norm for a package, clamped to [0,1]. Only the
    /// diffusion pass calls this, after every resident has stepped.
    pub fn set_subjective_norm(&mut self, kind: PackageKind, value: f64) {
        self.subjective_norm[kind] = value.clamp(0.0, 1.0);
    }

    /// Mark a package as decided without scoring.
    pub fn adopt(&mut self, kind: PackageKind) {
        self.decisions[kind] = true;
    }

    /// Current score for a package from the cached norm and control values.
    pub fn score(&self, package: &Package) -> f64 {
        let kind = package.kind();
        decision_score(
            &self.traits,
            self.subjective_norm[kind],
            package.subj_norm_mod(),
            self.behavioral_control[kind],
        )
    }

    /// One simulated year.
    ///
    /// For every undecided package: refresh behavioral control, score it with
    /// the norm cached from the previous diffusion pass, and decide when the
    /// score exceeds the threshold. If any package stays undecided the
    /// resident's income gets one raise drawn from `raise_income`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        profile: &HouseholdProfile,
        packages: &PackageMap<Package>,
        raise_income: &[Decimal],
        tally: &mut DecisionTally,
        rng: &mut R,
    ) {
        let mut still_undecided = false;
        for kind in PackageKind::ALL {
            if self.decisions[kind] {
                continue;
            }
            let package = &packages[kind];
            self.behavioral_control[kind] = package.behavioral_influence(self.income, profile);
            let score = self.score(package);
            if score > self.decision_threshold {
                self.decisions[kind] = true;
                tally[kind] += 1;
                trace!(resident = self.id.0, package = %kind, score, "resident decided");
            } else {
                still_undecided = true;
            }
        }
        if still_undecided {
            if let Some(m) = raise_income.choose(rng) {
                self.income = raised_income(self.income, *m);
            }
        }
    }

    /// Serializable view for household reports.
    pub fn record(&self) -> ResidentRecord {
        ResidentRecord {
            id: self.id,
            household: self.household,
            income: self.income,
            attitude: self.traits.attitude,
            attitude_mod: self.traits.attitude_mod,
            subj_norm_mod: self.traits.subj_norm_mod,
            behavioral_mod: self.traits.behavioral_mod,
            subjective_norm: self.subjective_norm,
            behavioral_control: self.behavioral_control,
            decisions: self.decisions,
        }
    }
}
