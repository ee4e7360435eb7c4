use std::fmt;

use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::firestore::value::FirestoreValue;

use super::database::Firestore;
use super::listener::ListenerRegistration;
use super::reference::CollectionReference;
use super::snapshot::DocumentSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    In,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitType {
    First,
    Last,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// Everything needed to evaluate a query, detached from the database handle.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    pub(crate) collection_path: ResourcePath,
    pub(crate) filters: Vec<FieldFilter>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<(u32, LimitType)>,
}

impl QueryDefinition {
    pub(crate) fn matches(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }
}

/// A Firestore query targeting a specific collection.
#[derive(Clone)]
pub struct Query {
    firestore: Firestore,
    definition: QueryDefinition,
}

impl Query {
    pub(crate) fn new(firestore: Firestore, collection_path: ResourcePath) -> Self {
        Self::from_definition(
            firestore,
            QueryDefinition {
                collection_path,
                filters: Vec::new(),
                order_by: Vec::new(),
                limit: None,
            },
        )
    }

    pub(crate) fn from_definition(firestore: Firestore, definition: QueryDefinition) -> Self {
        Self {
            firestore,
            definition,
        }
    }

    /// Returns the Firestore instance that created this query.
    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// Returns the full resource path to the targeted collection.
    pub fn collection_path(&self) -> &ResourcePath {
        &self.definition.collection_path
    }

    /// Returns a reference to the collection this query reads from.
    pub fn collection(&self) -> CollectionReference {
        CollectionReference::new(self.firestore.clone(), self.collection_path().clone())
            .expect("queries always target a collection path")
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    /// Returns a new query with `field op value` added to the filters.
    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Query> {
        let mut next = self.clone();
        next.definition.filters.push(FieldFilter {
            field: field.into_field_path()?,
            operator,
            value: value.into(),
        });
        Ok(next)
    }

    /// Returns a new query ordered by `field`.
    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: OrderDirection,
    ) -> FirestoreResult<Query> {
        let mut next = self.clone();
        next.definition.order_by.push(OrderBy {
            field: field.into_field_path()?,
            direction,
        });
        Ok(next)
    }

    /// Returns a new query that keeps the first `limit` matching documents.
    pub fn limit(&self, limit: u32) -> FirestoreResult<Query> {
        self.with_limit(limit, LimitType::First)
    }

    /// Returns a new query that keeps the last `limit` matching documents.
    pub fn limit_to_last(&self, limit: u32) -> FirestoreResult<Query> {
        self.with_limit(limit, LimitType::Last)
    }

    fn with_limit(&self, limit: u32, limit_type: LimitType) -> FirestoreResult<Query> {
        if limit == 0 {
            return Err(invalid_argument(
                "Invalid Query. Query limit must be greater than zero.",
            ));
        }
        let mut next = self.clone();
        next.definition.limit = Some((limit, limit_type));
        Ok(next)
    }

    /// Runs the query once against the current contents of the database.
    pub fn get(&self) -> FirestoreResult<QuerySnapshot> {
        self.firestore.run_query(&self.definition)
    }

    /// Attaches a realtime listener that receives the full result set after
    /// every change to the targeted collection.
    pub fn on_snapshot<N, E>(&self, next: N, error: E) -> ListenerRegistration
    where
        N: Fn(QuerySnapshot) + Send + Sync + 'static,
        E: Fn(FirestoreError) + Send + Sync + 'static,
    {
        self.firestore
            .listen_query(self.definition.clone(), next, error)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("definition", &self.definition)
            .finish()
    }
}

impl From<CollectionReference> for Query {
    fn from(reference: CollectionReference) -> Self {
        reference.query()
    }
}

impl From<&CollectionReference> for Query {
    fn from(reference: &CollectionReference) -> Self {
        reference.query()
    }
}

/// A single constraint produced by helpers such as [`where_field`] or
/// [`order_by`], applied through [`query`].
#[derive(Clone, Debug)]
pub struct QueryConstraint {
    kind: QueryConstraintKind,
}

#[derive(Clone, Debug)]
enum QueryConstraintKind {
    Where {
        field: String,
        operator: FilterOperator,
        value: FirestoreValue,
    },
    OrderBy {
        field: String,
        direction: OrderDirection,
    },
    Limit(u32),
    LimitToLast(u32),
}

impl QueryConstraint {
    fn new(kind: QueryConstraintKind) -> Self {
        Self { kind }
    }

    fn apply(self, query: Query) -> FirestoreResult<Query> {
        match self.kind {
            QueryConstraintKind::Where {
                field,
                operator,
                value,
            } => query.where_field(field, operator, value),
            QueryConstraintKind::OrderBy { field, direction } => query.order_by(field, direction),
            QueryConstraintKind::Limit(limit) => query.limit(limit),
            QueryConstraintKind::LimitToLast(limit) => query.limit_to_last(limit),
        }
    }
}

/// Creates a derived query by applying the provided constraints in order.
pub fn query(
    base: impl Into<Query>,
    constraints: impl IntoIterator<Item = QueryConstraint>,
) -> FirestoreResult<Query> {
    let mut current = base.into();
    for constraint in constraints {
        current = constraint.apply(current)?;
    }
    Ok(current)
}

pub fn where_field(
    field: impl Into<String>,
    operator: FilterOperator,
    value: impl Into<FirestoreValue>,
) -> QueryConstraint {
    QueryConstraint::new(QueryConstraintKind::Where {
        field: field.into(),
        operator,
        value: value.into(),
    })
}

pub fn order_by(field: impl Into<String>, direction: OrderDirection) -> QueryConstraint {
    QueryConstraint::new(QueryConstraintKind::OrderBy {
        field: field.into(),
        direction,
    })
}

pub fn limit(limit: u32) -> QueryConstraint {
    QueryConstraint::new(QueryConstraintKind::Limit(limit))
}

pub fn limit_to_last(limit: u32) -> QueryConstraint {
    QueryConstraint::new(QueryConstraintKind::LimitToLast(limit))
}

/// A snapshot containing the results of executing a query.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    query: Query,
    documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(query: Query, documents: Vec<DocumentSnapshot>) -> Self {
        Self { query, documents }
    }

    /// Returns the query used to obtain this snapshot.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Returns all document snapshots returned by the query.
    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}
