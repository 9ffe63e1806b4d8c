//! Street partition of the household population.
//!
//! Streets only scope social influence; they own nothing.

use rand::Rng;
use sim_core::{HouseholdId, StreetConfig, StreetId};
use tracing::debug;

/// Ordered households along one street.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Street {
    pub id: StreetId,
    pub households: Vec<HouseholdId>,
}

impl Street {
    pub fn len(&self) -> usize {
        self.households.len()
    }

    pub fn is_empty(&self) -> bool {
        self.households.is_empty()
    }
}

/// Greedily pack consecutive households into streets.
///
/// Each street length is drawn from `[min, max]`, or from the upper half of
/// that range with `large_street_chance`. Once fewer than `min` households
/// remain, each leftover joins a randomly chosen street. A population smaller
/// than `min` becomes a single street.
pub fn build_streets<R: Rng + ?Sized>(
    nr_households: usize,
    config: &StreetConfig,
    rng: &mut R,
) -> Vec<Street> {
    let min = (config.min_street_size as usize).max(1);
    let max = (config.max_street_size as usize).max(min);
    let mut streets: Vec<Street> = Vec::new();
    let mut next = 0;

    while nr_households - next >= min {
        let len = if rng.gen_bool(config.large_street_chance) {
            rng.gen_range((min + max) / 2..=max)
        } else {
            rng.gen_range(min..=max)
        };
        let len = len.min(nr_households - next);
        streets.push(Street {
            id: StreetId(streets.len()),
            households: (next..next + len).map(HouseholdId).collect(),
        });
        next += len;
    }

    if streets.is_empty() {
        if nr_households > 0 {
            streets.push(Street {
                id: StreetId(0),
                households: (0..nr_households).map(HouseholdId).collect(),
            });
        }
        return streets;
    }

    for h in next..nr_households {
        let s = rng.gen_range(0..streets.len());
        streets[s].households.push(HouseholdId(h));
    }
    debug!(
        streets = streets.len(),
        leftovers = nr_households - next,
        "streets built"
    );
    streets
}
