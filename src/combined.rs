//! `allOf` / `anyOf` / `oneOf` schema nodes.
//!
//! A [`CombinedSchema`] keeps its subschemas twice over: once in the order the
//! author supplied them, and once as a derived evaluation order in which every
//! nested combined schema comes before every leaf. The traversal engine walks
//! the evaluation order so that failures from nested compositions are
//! reported ahead of flat leaf failures. Equality and hashing are defined on
//! the evaluation order, so two nodes that differ only in how their children
//! were listed compare equal.
//!
//! # Example
//!
//! ```
//! use combined_schema::{CombinedSchema, Criterion, Schema, SchemaMeta};
//!
//! let nested = CombinedSchema::any_of([Schema::Null(SchemaMeta::default())])
//!     .build()
//!     .unwrap();
//! let schema = CombinedSchema::all_of([Schema::Boolean(SchemaMeta::default()), nested.into()])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.criterion(), &Criterion::ALL);
//! // Insertion order is preserved for introspection...
//! assert!(!schema.subschemas()[0].is_combined());
//! // ...while evaluation visits the nested anyOf first.
//! assert!(schema.subschemas_with_combined_first().next().unwrap().is_combined());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::criterion::Criterion;
use crate::error::BuildError;
use crate::schema::{Schema, SchemaMeta};

/// A composition node judged by a [`Criterion`].
#[derive(Debug, Clone)]
pub struct CombinedSchema {
    meta: SchemaMeta,
    criterion: Criterion,
    subschemas: Vec<Schema>,
    /// Indices into `subschemas`, combined nodes first.
    evaluation_order: Vec<usize>,
    synthetic: bool,
}

impl CombinedSchema {
    /// Empty builder; criterion and subschemas must both be set.
    pub fn builder() -> CombinedSchemaBuilder {
        CombinedSchemaBuilder::default()
    }

    /// Builder pre-populated with `subschemas` but no criterion.
    pub fn builder_with(subschemas: impl IntoIterator<Item = Schema>) -> CombinedSchemaBuilder {
        Self::builder().subschemas(subschemas)
    }

    /// Builder for an `allOf` node over `subschemas`.
    pub fn all_of(subschemas: impl IntoIterator<Item = Schema>) -> CombinedSchemaBuilder {
        Self::builder_with(subschemas).criterion(Criterion::ALL)
    }

    /// Builder for an `anyOf` node over `subschemas`.
    pub fn any_of(subschemas: impl IntoIterator<Item = Schema>) -> CombinedSchemaBuilder {
        Self::builder_with(subschemas).criterion(Criterion::ANY)
    }

    /// Builder for a `oneOf` node over `subschemas`.
    pub fn one_of(subschemas: impl IntoIterator<Item = Schema>) -> CombinedSchemaBuilder {
        Self::builder_with(subschemas).criterion(Criterion::ONE)
    }

    fn new(
        criterion: Criterion,
        subschemas: Vec<Schema>,
        synthetic: bool,
        meta: SchemaMeta,
    ) -> Self {
        let evaluation_order = combined_first_order(&subschemas);
        Self {
            meta,
            criterion,
            subschemas,
            evaluation_order,
            synthetic,
        }
    }

    /// The rule judging how many subschemas must match.
    pub fn criterion(&self) -> &Criterion {
        &self.criterion
    }

    /// Identity and description metadata of this node.
    pub fn meta(&self) -> &SchemaMeta {
        &self.meta
    }

    /// Subschemas in the order they were added.
    pub fn subschemas(&self) -> &[Schema] {
        &self.subschemas
    }

    /// Subschemas in the order a validator must visit them: every combined
    /// subschema before every other subschema.
    pub fn subschemas_with_combined_first(
        &self,
    ) -> impl ExactSizeIterator<Item = &Schema> + Clone + '_ {
        self.evaluation_order
            .iter()
            .map(move |&index| &self.subschemas[index])
    }

    /// Whether this node was generated while desugaring a schema document
    /// rather than written as an explicit composition keyword.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// True when two or more direct subschemas are combined schemas with the
    /// same criterion, e.g. two sibling `allOf` nodes.
    pub fn has_multiple_combined_schemas_of_same_criterion(&self) -> bool {
        let mut counts: HashMap<&Criterion, usize> = HashMap::new();
        for combined in self.subschemas.iter().filter_map(Schema::as_combined) {
            let count = counts.entry(combined.criterion()).or_insert(0);
            *count += 1;
            if *count > 1 {
                return true;
            }
        }
        false
    }

    /// Whether the subschemas defining `field` satisfy this node's criterion.
    ///
    /// This inspects schema shapes only; no instance is involved. A criterion
    /// failure means `false`, never an error.
    pub fn defines_property(&self, field: &str) -> bool {
        let matching = self
            .subschemas
            .iter()
            .filter(|subschema| subschema.defines_property(field))
            .count();
        self.criterion
            .validate(self.subschemas.len(), matching)
            .is_ok()
    }

    pub(crate) fn with_meta(mut self, meta: SchemaMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// Stable sort putting combined schemas first. Ties are broken by each
/// schema's structural hash, which keeps the order deterministic for a given
/// multiset of subschemas but carries no meaning.
fn combined_first_order(subschemas: &[Schema]) -> Vec<usize> {
    let keys: Vec<u64> = subschemas.iter().map(structural_hash).collect();
    let mut order: Vec<usize> = (0..subschemas.len()).collect();
    order.sort_by(|&left, &right| {
        let left_combined = subschemas[left].is_combined();
        let right_combined = subschemas[right].is_combined();
        right_combined
            .cmp(&left_combined)
            .then_with(|| keys[left].cmp(&keys[right]))
    });
    order
}

fn structural_hash(schema: &Schema) -> u64 {
    let mut hasher = DefaultHasher::new();
    schema.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for CombinedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.criterion == other.criterion
            && self.synthetic == other.synthetic
            && self.meta == other.meta
            && self
                .subschemas_with_combined_first()
                .eq(other.subschemas_with_combined_first())
    }
}

impl Eq for CombinedSchema {}

impl Hash for CombinedSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.hash(state);
        self.subschemas.len().hash(state);
        for subschema in self.subschemas_with_combined_first() {
            subschema.hash(state);
        }
        self.criterion.hash(state);
        self.synthetic.hash(state);
    }
}

/// Accumulates the parts of a [`CombinedSchema`].
///
/// Both a criterion and a subschema collection must be supplied before
/// [`build`](Self::build); an empty collection counts as supplied.
#[derive(Debug, Clone, Default)]
pub struct CombinedSchemaBuilder {
    criterion: Option<Criterion>,
    subschemas: Option<Vec<Schema>>,
    synthetic: bool,
    meta: SchemaMeta,
}

impl CombinedSchemaBuilder {
    /// Set or replace the criterion.
    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    /// Append one subschema, starting a collection if none was set.
    pub fn subschema(mut self, subschema: impl Into<Schema>) -> Self {
        self.subschemas
            .get_or_insert_with(Vec::new)
            .push(subschema.into());
        self
    }

    /// Replace the whole subschema collection.
    pub fn subschemas(mut self, subschemas: impl IntoIterator<Item = Schema>) -> Self {
        self.subschemas = Some(subschemas.into_iter().collect());
        self
    }

    /// Mark the node as generated rather than authored.
    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Replace all metadata at once.
    pub fn meta(mut self, meta: SchemaMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Set the `$id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.meta.id = Some(id.into());
        self
    }

    /// Set the `title`.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    /// Set the `description`.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    /// Freeze the accumulated state.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MissingCriterion` or `BuildError::MissingSubschemas`
    /// when either part was never supplied.
    pub fn build(self) -> Result<CombinedSchema, BuildError> {
        let criterion = self.criterion.ok_or(BuildError::MissingCriterion)?;
        let subschemas = self.subschemas.ok_or(BuildError::MissingSubschemas)?;
        Ok(CombinedSchema::new(
            criterion,
            subschemas,
            self.synthetic,
            self.meta,
        ))
    }
}
