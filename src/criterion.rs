//! Pass/fail policies for `allOf`, `anyOf` and `oneOf`.
//!
//! A criterion only ever sees two counts: how many subschemas a combined
//! schema has, and how many of them accepted the instance. The three
//! canonical policies are available as [`Criterion::ALL`], [`Criterion::ANY`]
//! and [`Criterion::ONE`]; anything implementing [`ValidationCriterion`] can
//! be plugged in with [`Criterion::custom`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::CriterionNotSatisfied;

/// Decides whether a combined schema matched from a tally of its subschemas.
///
/// Implementations must be stateless: the same counts always produce the same
/// verdict. The keyword is the criterion's identity; two criteria with the
/// same keyword are considered equal.
pub trait ValidationCriterion: fmt::Debug + Send + Sync {
    /// Keyword reported in diagnostics, e.g. `allOf`.
    fn keyword(&self) -> &str;

    /// Judge `matching_count` successes out of `subschema_count` subschemas.
    ///
    /// # Errors
    ///
    /// Returns `CriterionNotSatisfied` when the tally violates the rule.
    fn validate(
        &self,
        subschema_count: usize,
        matching_count: usize,
    ) -> Result<(), CriterionNotSatisfied>;
}

#[derive(Debug)]
struct AllCriterion;

impl ValidationCriterion for AllCriterion {
    fn keyword(&self) -> &str {
        "allOf"
    }

    fn validate(
        &self,
        subschema_count: usize,
        matching_count: usize,
    ) -> Result<(), CriterionNotSatisfied> {
        if matching_count != subschema_count {
            return Err(CriterionNotSatisfied::new(
                self.keyword(),
                format!(
                    "only {} subschema matches out of {}",
                    matching_count, subschema_count
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct AnyCriterion;

impl ValidationCriterion for AnyCriterion {
    fn keyword(&self) -> &str {
        "anyOf"
    }

    fn validate(
        &self,
        subschema_count: usize,
        matching_count: usize,
    ) -> Result<(), CriterionNotSatisfied> {
        if matching_count == 0 {
            return Err(CriterionNotSatisfied::new(
                self.keyword(),
                format!(
                    "no subschema matched out of the total {} subschemas",
                    subschema_count
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct OneCriterion;

impl ValidationCriterion for OneCriterion {
    fn keyword(&self) -> &str {
        "oneOf"
    }

    fn validate(
        &self,
        _subschema_count: usize,
        matching_count: usize,
    ) -> Result<(), CriterionNotSatisfied> {
        if matching_count != 1 {
            return Err(CriterionNotSatisfied::new(
                self.keyword(),
                format!("{} subschemas matched instead of one", matching_count),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
enum Policy {
    Builtin(&'static dyn ValidationCriterion),
    Custom(Arc<dyn ValidationCriterion>),
}

/// Cheaply cloneable handle to a validation criterion.
#[derive(Clone)]
pub struct Criterion(Policy);

impl Criterion {
    /// Every subschema must match (`allOf`).
    pub const ALL: Criterion = Criterion(Policy::Builtin(&AllCriterion));
    /// At least one subschema must match (`anyOf`).
    pub const ANY: Criterion = Criterion(Policy::Builtin(&AnyCriterion));
    /// Exactly one subschema must match (`oneOf`).
    pub const ONE: Criterion = Criterion(Policy::Builtin(&OneCriterion));

    /// Wrap a user-supplied criterion.
    pub fn custom<C: ValidationCriterion + 'static>(criterion: C) -> Self {
        Criterion(Policy::Custom(Arc::new(criterion)))
    }

    /// Look up a canonical criterion by its keyword.
    ///
    /// Returns `None` for anything other than `allOf`, `anyOf` or `oneOf`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "allOf" => Some(Criterion::ALL),
            "anyOf" => Some(Criterion::ANY),
            "oneOf" => Some(Criterion::ONE),
            _ => None,
        }
    }

    fn policy(&self) -> &dyn ValidationCriterion {
        match &self.0 {
            Policy::Builtin(policy) => *policy,
            Policy::Custom(policy) => policy.as_ref(),
        }
    }

    /// The composition keyword this criterion judges, e.g. `anyOf`.
    pub fn keyword(&self) -> &str {
        self.policy().keyword()
    }

    /// Judge a tally. See [`ValidationCriterion::validate`].
    pub fn validate(
        &self,
        subschema_count: usize,
        matching_count: usize,
    ) -> Result<(), CriterionNotSatisfied> {
        self.policy().validate(subschema_count, matching_count)
    }
}

impl PartialEq for Criterion {
    fn eq(&self, other: &Self) -> bool {
        self.keyword() == other.keyword()
    }
}

impl Eq for Criterion {}

impl Hash for Criterion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keyword().hash(state);
    }
}

impl fmt::Debug for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Criterion").field(&self.keyword()).finish()
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
