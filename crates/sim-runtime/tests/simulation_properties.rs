use proptest::prelude::*;
use rust_decimal::Decimal;
use sim_core::{
    validate_config, NormMode, PackageKind, PackageMap, ResidentTraits, SimConfig, ValidationError,
};
use sim_runtime::Simulation;

fn config(mode: NormMode, seed: u64, households: u32, residents: u32) -> SimConfig {
    SimConfig {
        nr_households: households,
        nr_residents: residents,
        simulation_years: 8,
        seed,
        norm_mode: mode,
        ..SimConfig::default()
    }
}

fn decisions(sim: &Simulation) -> Vec<PackageMap<bool>> {
    sim.households()
        .iter()
        .flat_map(|h| h.residents().iter().map(|r| *r.decisions()))
        .collect()
}

fn installations(sim: &Simulation) -> Vec<PackageMap<bool>> {
    sim.households().iter().map(|h| h.profile().installed).collect()
}

fn all_norms(sim: &Simulation, kind: PackageKind) -> Vec<f64> {
    sim.households()
        .iter()
        .flat_map(|h| h.residents().iter().map(move |r| r.subjective_norm(kind)))
        .collect()
}

fn never_regresses(before: &[PackageMap<bool>], after: &[PackageMap<bool>]) -> bool {
    before.iter().zip(after).all(|(b, a)| {
        PackageKind::ALL
            .iter()
            .all(|&k| !b[k] || a[k])
    })
}

#[test]
fn same_seed_same_history() {
    let run = || {
        let mut sim = Simulation::create(config(NormMode::Street, 7, 200, 430)).expect("valid");
        for _ in 0..8 {
            sim.run_year();
        }
        (sim.history().to_vec(), sim.household_report())
    };
    assert_eq!(run(), run());
}

#[test]
fn different_seeds_diverge() {
    let a = Simulation::create(config(NormMode::Street, 1, 200, 430)).expect("valid");
    let b = Simulation::create(config(NormMode::Street, 2, 200, 430)).expect("valid");
    assert_ne!(a.household_report(), b.household_report());
}

#[test]
fn fewer_residents_than_households_is_rejected() {
    let err = Simulation::create(config(NormMode::District, 1, 10, 9)).err();
    assert_eq!(
        err,
        Some(ValidationError::PopulationMismatch {
            residents: 9,
            households: 10
        })
    );
}

#[test]
fn steep_raises_never_abort_a_valid_run() {
    let mut config = SimConfig::testing();
    config.simulation_years = 40;
    config.resident.raise_income = vec![Decimal::TEN];
    config.resident.traits = Some(ResidentTraits {
        attitude: 0.0,
        attitude_mod: 0.0,
        subj_norm_mod: 0.0,
        behavioral_mod: 0.0,
    });
    assert_eq!(validate_config(&config), Ok(()));
    let mut sim = Simulation::create(config).expect("valid");
    while !sim.is_finished() {
        sim.run_year();
    }
    let top = sim
        .households()
        .iter()
        .flat_map(|h| h.residents().iter().map(|r| r.income()))
        .max()
        .expect("residents");
    assert!(top > Decimal::from(10u64.pow(18)));
}

#[test]
fn long_horizon_with_default_raises_completes() {
    let mut config = SimConfig::testing();
    config.simulation_years = 1500;
    let mut sim = Simulation::create(config).expect("valid");
    while !sim.is_finished() {
        sim.run_year();
    }
    assert_eq!(sim.history().len(), 1500);
}

#[test]
fn initial_installs_are_inherited_by_residents() {
    let sim = Simulation::create(config(NormMode::Street, 3, 300, 600)).expect("valid");
    for h in sim.households() {
        for kind in PackageKind::ALL {
            if h.is_installed(kind) {
                assert!(h.residents().iter().all(|r| r.has_decided(kind)));
            }
        }
    }
}

#[test]
fn history_counts_match_population() {
    let mut sim = Simulation::create(config(NormMode::Direct, 5, 150, 320)).expect("valid");
    let mut previous = sim.decided_counts();
    for _ in 0..5 {
        let snap = sim.run_year();
        assert_eq!(snap.installed, sim.installed_counts());
        assert_eq!(snap.residents_decided, sim.decided_counts());
        for kind in PackageKind::ALL {
            assert_eq!(
                snap.residents_decided[kind],
                previous[kind] + snap.decisions[kind]
            );
        }
        previous = snap.residents_decided;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn state_is_monotonic_and_bounded(seed in any::<u64>(),
                                      mode_idx in 0usize..3,
                                      households in 1u32..60,
                                      extra in 0u32..60) {
        let mode = [NormMode::District, NormMode::Street, NormMode::Direct][mode_idx];
        let mut sim = Simulation::create(config(mode, seed, households, households + extra))
            .expect("valid");
        for _ in 0..8 {
            let decided = decisions(&sim);
            let installed = installations(&sim);
            let prices = sim.prices();
            let saved: Vec<f64> = sim.households().iter().map(|h| h.co2_saved_kg()).collect();

            let snap = sim.run_year();

            prop_assert!(never_regresses(&decided, &decisions(&sim)));
            prop_assert!(never_regresses(&installed, &installations(&sim)));
            for kind in PackageKind::ALL {
                prop_assert!(snap.prices[kind] >= prices[kind]);
                prop_assert!(all_norms(&sim, kind).iter().all(|n| (0.0..=1.0).contains(n)));
            }
            for ((h, before), was) in sim.households().iter().zip(&saved).zip(&installed) {
                let newly = PackageKind::ALL.iter().any(|&k| !was[k] && h.is_installed(k));
                if !newly {
                    prop_assert_eq!(h.co2_saved_kg(), *before);
                }
            }
        }
    }

    #[test]
    fn district_norm_is_uniform(seed in any::<u64>(), households in 2u32..80) {
        let mut sim = Simulation::create(config(NormMode::District, seed, households, households * 2))
            .expect("valid");
        for _ in 0..4 {
            sim.run_year();
            for kind in PackageKind::ALL {
                let norms = all_norms(&sim, kind);
                let expected = f64::from(sim.installed_counts()[kind]) / f64::from(households - 1);
                let expected = expected.min(1.0);
                prop_assert!(norms.iter().all(|n| (n - expected).abs() < 1e-12));
            }
        }
    }
}
