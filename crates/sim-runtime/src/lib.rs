#![deny(warnings)]

//! Year-stepped adoption simulation.
//!
//! [`Simulation`] owns the packages, the household population and its street
//! partition. Each year residents decide, households aggregate their votes,
//! norms diffuse, and prices drift, in that order.

mod control;
mod diffusion;
mod household;
mod simulation;
mod streets;

pub use control::{run, RunControl, RunOutcome};
pub use diffusion::{diffuse, NEIGHBOR_INFLUENCE};
pub use household::Household;
pub use simulation::{PopulationSummary, Simulation};
pub use streets::{build_streets, Street};
