//! Count execution.

use crate::{
    access::StoreAccess,
    compiler::{Plan, Strategy},
    error::AdapterResult,
    find::{FindManyOptions, find_many},
    naming::FieldMapper,
};

/// Counts the records a plan matches.
///
/// A fully native conjunctive request uses the store's aggregate count. Every
/// other shape fetches its candidates and counts what survives in-process
/// filtering; a union counts each identifier once.
pub async fn count<A>(
    access: &mut A,
    collection: &str,
    plan: &Plan,
    mapper: &FieldMapper,
) -> AdapterResult<u64>
where
    A: StoreAccess + ?Sized,
{
    match plan {
        Plan::Single(Strategy::Query(compiled)) if compiled.is_native() => {
            access.count(collection, &compiled.native).await
        },
        _ => {
            let records = find_many(access, collection, plan, &FindManyOptions::default(), mapper).await?;
            Ok(records.len() as u64)
        },
    }
}
