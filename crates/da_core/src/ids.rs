//! Integer id newtypes and the program-graph key.
//!
//! Every entity the engine touches is identified by a plain integer in the
//! input tables; the newtypes keep them from being mixed up at call sites.
//! All ids derive `Ord` so graphs can live in `BTreeMap`s and iterate in a
//! stable order.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! def_id {
    ($(#[$doc:meta])* $name:ident, $raw:ty) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name($raw);

        impl $name {
            pub const fn new(raw: $raw) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> $raw {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                Self(raw)
            }
        }
    };
}

def_id!(
    /// Applicant (student) identifier.
    ApplicantId, u64
);
def_id!(
    /// Program identifier. A program is grade-scoped in the input data.
    ProgramId, u32
);
def_id!(
    /// Institution (school) identifier; several programs share one.
    InstitutionId, u32
);
def_id!(
    /// Seat-category identifier within a program.
    QuotaId, u32
);
def_id!(
    /// Priority-profile tag; selects the applicant's priority class at a program.
    ProfileId, u32
);

/// Grade level. Signed so pre-school levels can sit below zero.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GradeId(i32);

impl GradeId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for GradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for GradeId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// Assignment-type tag: 0 is the regular cohort, positive values are the
/// typed special cohorts (each backed by its own seat queue).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AssignmentType(u32);

impl AssignmentType {
    pub const REGULAR: AssignmentType = AssignmentType(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_regular(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AssignmentType {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Node key of the program graph. A program offering N quota types becomes
/// N matching entities, one per key.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgramKey {
    pub program: ProgramId,
    pub quota: QuotaId,
}

impl ProgramKey {
    pub const fn new(program: ProgramId, quota: QuotaId) -> Self {
        Self { program, quota }
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.program, self.quota)
    }
}
