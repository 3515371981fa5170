//! da_algo — Algorithm layer of the school-choice engine.
//!
//! Pure, single-threaded matching primitives over the types in `da_core`:
//!
//! - [`queue::SeatQueue`]: the bounded reject-queue behind every
//!   (program, quota, assignment-type) seat pool
//! - [`program::Program`]: one (program, quota) node of the matching graph
//! - [`applicant::Applicant`]: preference records plus the dynamic
//!   re-ranking operations applied between rounds
//! - [`engine::run_cohort`]: applicant-proposing deferred acceptance over
//!   one cohort
//! - [`lottery::Lottery`]: seeded tie-break generation with sibling
//!   propagation
//!
//! Orchestration across grades and assignment types lives in `da_pipeline`;
//! nothing here performs I/O.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod errors;

pub mod applicant;
pub mod engine;
pub mod lottery;
pub mod program;
pub mod queue;

pub use applicant::{Applicant, Preference, ProfileTransitions};
pub use engine::run_cohort;
pub use errors::{LotteryError, MatchError};
pub use lottery::Lottery;
pub use program::Program;
pub use queue::SeatQueue;
