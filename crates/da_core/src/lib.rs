//! da_core — Core types, rule domains, and deterministic RNG.
//!
//! This crate is **I/O-free**. It defines the stable types shared by the
//! engine crates (`da_algo`, `da_pipeline`):
//!
//! - Integer id newtypes and the `(program, quota)` graph key
//! - Comparison criteria used by quota-order predicate tables
//! - Rule domains: `MatchRules`, `GradeOrder`, `TieBreak`, `LotteryRules`
//! - Typed rows for the tabular data contracts ("frames")
//! - Seedable RNG (ChaCha20) for lottery draws **only**
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain parsing.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        /// A criteria cell held a token that is not a comparison operator.
        InvalidCriterion,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidCriterion => write!(f, "invalid criterion token"),
            }
        }
    }
}

pub mod ids;
pub mod criteria;
pub mod config;
pub mod frames;
pub mod rng;

pub use config::{GradeOrder, LotteryRules, MatchRules, TieBreak, TieBreakLevel};
pub use criteria::Criterion;
pub use errors::CoreError;
pub use ids::{
    ApplicantId, AssignmentType, GradeId, InstitutionId, ProfileId, ProgramId, ProgramKey,
    QuotaId,
};
pub use rng::LotteryRng;
