//! Query execution and merging.
//!
//! Executes a [`Plan`] against a [`StoreAccess`] and produces canonical records.
//! Sorting, offset and limit are applied after all filtering in every request
//! shape: natively when the store answers the whole request, in process
//! otherwise.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    access::StoreAccess,
    compiler::{Compiled, Plan, Strategy, matches_all},
    error::AdapterResult,
    naming::FieldMapper,
    predicate::{ID_FIELD, Predicate, SortBy, key_from_value, single_identifier},
    query::{Order, OrderPath, Query, SortDirection},
    record::{Record, StoredDocument},
    value::sort_order,
};

/// Sorting, pagination and projection for `find_many`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindManyOptions {
    #[serde(rename = "sortBy")]
    pub sort: Option<SortBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Fields to keep besides `id`. Empty keeps everything.
    pub select: Vec<String>,
}

impl FindManyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The requested limit; zero means no limit.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0)
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Returns the first record matching `predicates`.
///
/// A lone identifier equality is a direct key read; anything else runs the full
/// find pipeline with a limit of one.
pub async fn find_one<A>(
    access: &mut A,
    collection: &str,
    predicates: &[Predicate],
    mapper: &FieldMapper,
) -> AdapterResult<Option<Record>>
where
    A: StoreAccess + ?Sized,
{
    if let Some(value) = single_identifier(predicates) {
        let key = key_from_value(value)?;
        return Ok(access
            .get(collection, &key)
            .await?
            .and_then(|document| Record::materialize(document, mapper)));
    }

    let plan = crate::compiler::plan(predicates, mapper)?;
    let options = FindManyOptions::new().limit(1);

    Ok(find_many(access, collection, &plan, &options, mapper)
        .await?
        .into_iter()
        .next())
}

/// Executes a plan. `options.select` is left to the caller.
pub async fn find_many<A>(
    access: &mut A,
    collection: &str,
    plan: &Plan,
    options: &FindManyOptions,
    mapper: &FieldMapper,
) -> AdapterResult<Vec<Record>>
where
    A: StoreAccess + ?Sized,
{
    match plan {
        Plan::Single(strategy) => fetch(access, collection, strategy, Some(options), mapper).await,
        Plan::Union { groups, post_filter } => {
            let mut seen = HashSet::new();
            let mut merged = Vec::new();

            for strategy in groups {
                for record in fetch(access, collection, strategy, None, mapper).await? {
                    if seen.insert(record.id.clone()) {
                        merged.push(record);
                    }
                }
            }
            merged.retain(|record| matches_all(record, post_filter));

            Ok(paginate(sort_records(merged, options.sort.as_ref()), options))
        },
    }
}

/// Fetches one conjunctive group. With a window, the group is the whole request
/// and sorting and pagination are applied here.
async fn fetch<A>(
    access: &mut A,
    collection: &str,
    strategy: &Strategy,
    window: Option<&FindManyOptions>,
    mapper: &FieldMapper,
) -> AdapterResult<Vec<Record>>
where
    A: StoreAccess + ?Sized,
{
    match strategy {
        Strategy::KeyLookup { keys, residual } => {
            let documents = access.get_many(collection, keys).await?;
            let records = filtered(documents.into_iter().flatten(), residual, mapper);

            Ok(match window {
                Some(options) => paginate(sort_records(records, options.sort.as_ref()), options),
                None => records,
            })
        },
        Strategy::Query(compiled) if compiled.is_native() => {
            let query = match window {
                Some(options) => windowed(compiled, options, mapper),
                None => compiled.native.clone(),
            };

            Ok(filtered(access.query(collection, &query).await?, &[], mapper))
        },
        Strategy::Query(compiled) => {
            let mut query = compiled.native.clone();
            if let Some(sort) = window.and_then(|options| options.sort.as_ref()) {
                query.order = Some(native_order(sort, mapper));
            }

            let records = filtered(access.query(collection, &query).await?, &compiled.residual, mapper);

            Ok(match window {
                Some(options) => paginate(records, options),
                None => records,
            })
        },
    }
}

fn filtered<I>(documents: I, residual: &[Predicate], mapper: &FieldMapper) -> Vec<Record>
where
    I: IntoIterator<Item = StoredDocument>,
{
    documents
        .into_iter()
        .filter_map(|document| Record::materialize(document, mapper))
        .filter(|record| matches_all(record, residual))
        .collect()
}

/// Pushes sorting and pagination of a fully native request into the query.
fn windowed(compiled: &Compiled, options: &FindManyOptions, mapper: &FieldMapper) -> Query {
    let mut query = compiled.native.clone();

    query.order = match &options.sort {
        Some(sort) => Some(native_order(sort, mapper)),
        // Offsets need a stable order.
        None if options.offset.is_some() => Some(Order {
            path: OrderPath::DocumentKey,
            direction: SortDirection::Asc,
        }),
        None => None,
    };
    query.offset = options.offset;
    query.limit = options.effective_limit();

    query
}

fn native_order(sort: &SortBy, mapper: &FieldMapper) -> Order {
    let path = if sort.field == ID_FIELD {
        OrderPath::DocumentKey
    } else {
        OrderPath::Field(mapper.to_db(&sort.field).to_string())
    };

    Order { path, direction: sort.direction }
}

/// Stable in-process sort on a canonical field; incomparable values tie.
pub(crate) fn sort_records(mut records: Vec<Record>, sort: Option<&SortBy>) -> Vec<Record> {
    if let Some(sort) = sort {
        records.sort_by(|a, b| {
            let ordering = sort_order(a.get(&sort.field).as_ref(), b.get(&sort.field).as_ref());
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
    records
}

pub(crate) fn paginate(records: Vec<Record>, options: &FindManyOptions) -> Vec<Record> {
    records
        .into_iter()
        .skip(options.offset.unwrap_or(0))
        .take(options.effective_limit().unwrap_or(usize::MAX))
        .collect()
}
