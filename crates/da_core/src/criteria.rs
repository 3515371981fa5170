//! Comparison criteria for quota-order predicate tables.
//!
//! Criteria cells carry either a symbol (`<`, `<=`, `>`, `>=`, `=`, `==`,
//! `!=`) or a textual synonym. The synonym mapping is the one production
//! tables were authored against: `le` and `ge` are the *strict* comparisons,
//! `leq`/`geq` the inclusive ones.

use core::str::FromStr;

use crate::errors::CoreError;

/// A binary comparison applied to an applicant attribute.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Criterion {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Criterion {
    /// Evaluate `lhs <op> rhs`. Attributes and comparison values are carried
    /// as `f64` in the tables; equality here is exact, which is what integer
    /// attribute values give.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Criterion::Lt => lhs < rhs,
            Criterion::Le => lhs <= rhs,
            Criterion::Gt => lhs > rhs,
            Criterion::Ge => lhs >= rhs,
            Criterion::Eq => lhs == rhs,
            Criterion::Ne => lhs != rhs,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Criterion::Lt => "<",
            Criterion::Le => "<=",
            Criterion::Gt => ">",
            Criterion::Ge => ">=",
            Criterion::Eq => "==",
            Criterion::Ne => "!=",
        }
    }
}

impl FromStr for Criterion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" | "le" => Ok(Criterion::Lt),
            "<=" | "leq" => Ok(Criterion::Le),
            ">" | "ge" => Ok(Criterion::Gt),
            ">=" | "geq" => Ok(Criterion::Ge),
            "=" | "==" | "eq" => Ok(Criterion::Eq),
            "!=" | "neq" => Ok(Criterion::Ne),
            _ => Err(CoreError::InvalidCriterion),
        }
    }
}

impl core::fmt::Display for Criterion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbols_and_synonyms() {
        assert_eq!("<".parse::<Criterion>().unwrap(), Criterion::Lt);
        assert_eq!("le".parse::<Criterion>().unwrap(), Criterion::Lt);
        assert_eq!("leq".parse::<Criterion>().unwrap(), Criterion::Le);
        assert_eq!("ge".parse::<Criterion>().unwrap(), Criterion::Gt);
        assert_eq!("geq".parse::<Criterion>().unwrap(), Criterion::Ge);
        assert_eq!("=".parse::<Criterion>().unwrap(), Criterion::Eq);
        assert_eq!("==".parse::<Criterion>().unwrap(), Criterion::Eq);
        assert_eq!("eq".parse::<Criterion>().unwrap(), Criterion::Eq);
        assert_eq!("neq".parse::<Criterion>().unwrap(), Criterion::Ne);
        assert!("between".parse::<Criterion>().is_err());
    }

    #[test]
    fn evaluation() {
        assert!(Criterion::Lt.holds(1.0, 2.0));
        assert!(!Criterion::Lt.holds(2.0, 2.0));
        assert!(Criterion::Le.holds(2.0, 2.0));
        assert!(Criterion::Ne.holds(1.0, 2.0));
        assert!(Criterion::Eq.holds(3.0, 3.0));
    }
}
