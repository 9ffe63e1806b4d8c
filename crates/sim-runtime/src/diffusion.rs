//! Social influence: recompute every resident's subjective norm from the
//! installations of surrounding households.
//!
//! A pass runs after all households have stepped, so residents never see a
//! norm written during the step they are deciding in.

use crate::household::Household;
use crate::streets::Street;
use sim_core::{NormMode, PackageKind};

/// Norm added per adopting direct neighbor.
pub const NEIGHBOR_INFLUENCE: f64 = 0.5;

fn ratio(installed: usize, population: usize) -> f64 {
    let peers = population.saturating_sub(1).max(1);
    (installed as f64 / peers as f64).clamp(0.0, 1.0)
}

fn set_norm(household: &mut Household, kind: PackageKind, value: f64) {
    for r in household.residents_mut() {
        r.set_subjective_norm(kind, value);
    }
}

/// Full recompute of all subjective norms in the given mode.
///
/// `base_norm` is only used by [`NormMode::Direct`], which resets to it
/// before adding neighbor influence.
pub fn diffuse(mode: NormMode, base_norm: f64, households: &mut [Household], streets: &[Street]) {
    for kind in PackageKind::ALL {
        match mode {
            NormMode::District => district(kind, households),
            NormMode::Street => street(kind, households, streets),
            NormMode::Direct => direct(kind, base_norm, households, streets),
        }
    }
}

fn district(kind: PackageKind, households: &mut [Household]) {
    let installed = households.iter().filter(|h| h.is_installed(kind)).count();
    let norm = ratio(installed, households.len());
    for h in households.iter_mut() {
        set_norm(h, kind, norm);
    }
}

fn street(kind: PackageKind, households: &mut [Household], streets: &[Street]) {
    for s in streets {
        let installed = s
            .households
            .iter()
            .filter(|id| households[id.0].is_installed(kind))
            .count();
        let norm = ratio(installed, s.len());
        for id in &s.households {
            set_norm(&mut households[id.0], kind, norm);
        }
    }
}

fn direct(kind: PackageKind, base_norm: f64, households: &mut [Household], streets: &[Street]) {
    let installed: Vec<bool> = households.iter().map(|h| h.is_installed(kind)).collect();
    for h in households.iter_mut() {
        set_norm(h, kind, base_norm);
        h.skip_prev[kind] = false;
        h.skip_next[kind] = false;
    }
    for s in streets {
        let ids = &s.households;
        for (i, id) in ids.iter().enumerate() {
            let prev = i > 0 && installed[ids[i - 1].0];
            let next = i + 1 < ids.len() && installed[ids[i + 1].0];
            let h = &mut households[id.0];
            let mut boost = 0.0;
            if prev && !h.skip_prev[kind] {
                h.skip_prev[kind] = true;
                boost += NEIGHBOR_INFLUENCE;
            }
            if next && !h.skip_next[kind] {
                h.skip_next[kind] = true;
                boost += NEIGHBOR_INFLUENCE;
            }
            if boost > 0.0 {
                for r in h.residents_mut() {
                    let current = r.subjective_norm(kind);
                    r.set_subjective_norm(kind, current + boost);
                }
            }
        }
    }
}
