use std::cmp::Ordering;

use crate::firestore::api::{
    DocumentSnapshot, FieldFilter, FilterOperator, LimitType, OrderBy, OrderDirection,
    QueryDefinition,
};
use crate::firestore::model::FieldPath;
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

/// Applies the query definition to a set of candidate documents and returns
/// the filtered, ordered, and limited result set.
///
/// Documents that compare equal under every `order_by` clause keep document
/// path order, which is also the order used when no clause is given.
pub(crate) fn apply_query_to_documents(
    documents: Vec<DocumentSnapshot>,
    definition: &QueryDefinition,
) -> Vec<DocumentSnapshot> {
    let mut filtered: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(|snapshot| snapshot.exists())
        .filter(|snapshot| document_satisfies_filters(snapshot, &definition.filters))
        .collect();

    filtered.sort_by(|left, right| {
        compare_snapshots(left, right, &definition.order_by)
            .then_with(|| left.reference().path().cmp(right.reference().path()))
    });

    if let Some((limit, limit_type)) = definition.limit {
        let limit = limit as usize;
        if filtered.len() > limit {
            match limit_type {
                LimitType::First => filtered.truncate(limit),
                LimitType::Last => {
                    let start = filtered.len() - limit;
                    filtered.drain(0..start);
                }
            }
        }
    }

    filtered
}

fn document_satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters
        .iter()
        .all(|filter| match get_field_value(snapshot, filter.field()) {
            Some(value) => evaluate_filter(filter, value),
            None => false,
        })
}

fn evaluate_filter(filter: &FieldFilter, value: &FirestoreValue) -> bool {
    match filter.operator() {
        FilterOperator::Equal => value == filter.value(),
        FilterOperator::NotEqual => value != filter.value() && !value.is_null(),
        FilterOperator::LessThan => compare_values(value, filter.value()) == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => matches!(
            compare_values(value, filter.value()),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::GreaterThan => {
            compare_values(value, filter.value()) == Some(Ordering::Greater)
        }
        FilterOperator::GreaterThanOrEqual => matches!(
            compare_values(value, filter.value()),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::ArrayContains => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| item == filter.value())),
        FilterOperator::In => filter
            .value()
            .as_array()
            .is_some_and(|needles| needles.iter().any(|needle| needle == value)),
    }
}

fn get_field_value<'a>(
    snapshot: &'a DocumentSnapshot,
    field: &FieldPath,
) -> Option<&'a FirestoreValue> {
    find_in_map(snapshot.data()?, field.segments())
}

fn find_in_map<'a>(map: &'a DocumentData, segments: &[String]) -> Option<&'a FirestoreValue> {
    let (first, rest) = segments.split_first()?;
    let value = map.get(first)?;
    if rest.is_empty() {
        Some(value)
    } else if let ValueKind::Map(child) = value.kind() {
        find_in_map(child, rest)
    } else {
        None
    }
}

fn compare_snapshots(
    left: &DocumentSnapshot,
    right: &DocumentSnapshot,
    order_by: &[OrderBy],
) -> Ordering {
    let null = FirestoreValue::null();
    for order in order_by {
        let left_value = get_field_value(left, order.field()).unwrap_or(&null);
        let right_value = get_field_value(right, order.field()).unwrap_or(&null);

        let mut ordering = compare_values(left_value, right_value).unwrap_or(Ordering::Equal);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(left: &FirestoreValue, right: &FirestoreValue) -> Option<Ordering> {
    match (left.kind(), right.kind()) {
        (ValueKind::Null, ValueKind::Null) => Some(Ordering::Equal),
        (ValueKind::Boolean(a), ValueKind::Boolean(b)) => Some(a.cmp(b)),
        (ValueKind::Integer(a), ValueKind::Integer(b)) => Some(a.cmp(b)),
        (ValueKind::Double(a), ValueKind::Double(b)) => a.partial_cmp(b),
        (ValueKind::Integer(a), ValueKind::Double(b)) => (*a as f64).partial_cmp(b),
        (ValueKind::Double(a), ValueKind::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
        (ValueKind::Reference(a), ValueKind::Reference(b)) => Some(a.path().cmp(b.path())),
        _ => None,
    }
}
