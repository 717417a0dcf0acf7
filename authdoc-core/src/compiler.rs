//! Predicate compilation and request planning.
//!
//! [`compile`] partitions a conjunctive predicate list into a native [`Query`] and
//! the residual predicates evaluated in process. [`plan`] decides how a whole
//! request is fetched: by key, as one compiled query, or as a union of OR groups.
//! Every executor (find, count, mutations) starts from a [`Plan`].

use std::collections::HashSet;

use bson::Bson;

use crate::{
    error::AdapterResult,
    naming::FieldMapper,
    predicate::{Connector, ExecutionClass, Operator, Predicate, key_from_value},
    query::Query,
    record::Record,
    timestamp::normalize,
    value::as_list,
};

/// A conjunctive request split by execution class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    /// Constraints the store evaluates.
    pub native: Query,
    /// Predicates evaluated against materialized records, values normalized.
    pub residual: Vec<Predicate>,
}

impl Compiled {
    pub fn is_native(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Compiles a conjunctive predicate list.
///
/// Connectors are ignored here; callers split OR groups first with
/// [`split_groups`].
pub fn compile(predicates: &[Predicate], mapper: &FieldMapper) -> AdapterResult<Compiled> {
    let mut compiled = Compiled::default();

    for predicate in predicates {
        match predicate.execution_class() {
            ExecutionClass::Native => {
                let field = mapper.to_db(&predicate.field);
                compiled.native.filters.extend(
                    predicate.operator.native_filters(field, &predicate.value)?
                );
            },
            ExecutionClass::ClientSide => compiled.residual.push(as_residual(predicate)),
        }
    }

    Ok(compiled)
}

/// Splits a predicate list into OR groups.
///
/// A predicate whose connector is OR starts a new group, unless the current group
/// is still empty. Within a group every predicate is conjunctive.
pub fn split_groups(predicates: &[Predicate]) -> Vec<&[Predicate]> {
    let mut groups = Vec::new();
    let mut start = 0;

    for (index, predicate) in predicates.iter().enumerate() {
        if predicate.connector == Connector::Or && index > start {
            groups.push(&predicates[start..index]);
            start = index;
        }
    }

    if start < predicates.len() {
        groups.push(&predicates[start..]);
    }

    groups
}

/// How one conjunctive group is fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Direct key lookups. Every other predicate of the group is evaluated in
    /// process, so `residual` holds canonical-field predicates.
    KeyLookup {
        keys: Vec<String>,
        residual: Vec<Predicate>,
    },
    /// One store query plus in-process residual filtering.
    Query(Compiled),
}

impl Strategy {
    /// Plans a single conjunctive group.
    pub fn for_group(predicates: &[Predicate], mapper: &FieldMapper) -> AdapterResult<Self> {
        let lookup = predicates
            .iter()
            .position(|p| p.is_identifier() && matches!(p.operator, Operator::Eq | Operator::In));

        let Some(index) = lookup else {
            return Ok(Strategy::Query(compile(predicates, mapper)?));
        };

        let mut seen = HashSet::new();
        let keys = as_list(&predicates[index].value)
            .into_iter()
            .map(key_from_value)
            .collect::<AdapterResult<Vec<_>>>()?
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let residual = predicates
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, predicate)| as_residual(predicate))
            .collect();

        Ok(Strategy::KeyLookup { keys, residual })
    }

    /// Whether the store can answer the group without in-process filtering.
    pub fn is_native(&self) -> bool {
        matches!(self, Strategy::Query(compiled) if compiled.is_native())
    }

    pub fn residual(&self) -> &[Predicate] {
        match self {
            Strategy::KeyLookup { residual, .. } => residual,
            Strategy::Query(compiled) => &compiled.residual,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Strategy::KeyLookup { .. } => "key_lookup",
            Strategy::Query(compiled) if compiled.is_native() => "native",
            Strategy::Query(_) => "residual",
        }
    }
}

/// How a whole request is fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// A conjunctive request.
    Single(Strategy),
    /// OR groups fetched one after another and merged by identifier.
    ///
    /// `post_filter` holds every client-side-only predicate on an ordinary field
    /// from any group; it is applied to the merged set.
    Union {
        groups: Vec<Strategy>,
        post_filter: Vec<Predicate>,
    },
}

impl Plan {
    pub fn shape(&self) -> &'static str {
        match self {
            Plan::Single(strategy) => strategy.shape(),
            Plan::Union { .. } => "union",
        }
    }
}

/// Plans a request. Disjunction is detected before any identifier fast path.
pub fn plan(predicates: &[Predicate], mapper: &FieldMapper) -> AdapterResult<Plan> {
    let groups = split_groups(predicates);

    if groups.len() > 1 {
        let groups = groups
            .into_iter()
            .map(|group| Strategy::for_group(group, mapper))
            .collect::<AdapterResult<Vec<_>>>()?;
        let post_filter = predicates
            .iter()
            .filter(|predicate| is_client_side_only(predicate))
            .map(as_residual)
            .collect();

        return Ok(Plan::Union { groups, post_filter });
    }

    Strategy::for_group(predicates, mapper).map(Plan::Single)
}

/// Evaluates residual predicates against a record. All must hold.
pub fn matches_all(record: &Record, residual: &[Predicate]) -> bool {
    residual
        .iter()
        .all(|predicate| {
            predicate.operator.matches(record.get(&predicate.field).as_ref(), &predicate.value)
        })
}

/// Drops client-side-only predicates on ordinary fields, for bulk mutations.
///
/// Returns the kept predicates and the dropped ones. An OR connector on a dropped
/// predicate moves to the next kept predicate so group boundaries survive.
pub fn without_client_side(predicates: &[Predicate]) -> (Vec<Predicate>, Vec<Predicate>) {
    let mut kept = Vec::with_capacity(predicates.len());
    let mut dropped = Vec::new();
    let mut pending_or = false;

    for predicate in predicates {
        if is_client_side_only(predicate) {
            pending_or |= predicate.connector == Connector::Or;
            dropped.push(predicate.clone());
            continue;
        }

        let mut predicate = predicate.clone();
        if pending_or {
            predicate.connector = Connector::Or;
            pending_or = false;
        }
        kept.push(predicate);
    }

    (kept, dropped)
}

/// `notIn`, `endsWith` and `contains` on an ordinary field.
fn is_client_side_only(predicate: &Predicate) -> bool {
    !predicate.is_identifier()
        && predicate.operator.execution_class() == ExecutionClass::ClientSide
}

fn as_residual(predicate: &Predicate) -> Predicate {
    Predicate {
        value: normalize(predicate.value.clone()),
        ..predicate.clone()
    }
}

/// Renders predicates for log output.
pub fn describe(predicates: &[Predicate]) -> Vec<String> {
    predicates
        .iter()
        .map(|p| format!("{} {} {}", p.field, p.operator, display_value(&p.value)))
        .collect()
}

fn display_value(value: &Bson) -> String {
    match value {
        Bson::String(text) => format!("{text:?}"),
        other => other.to_string(),
    }
}
