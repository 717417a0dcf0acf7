//! Mutation execution.
//!
//! Single-record mutations locate their target through [`find_one`], so a lone
//! identifier equality is a direct key path and anything else mutates the first
//! match of the full find pipeline. Bulk mutations act on every record a plan
//! matches.

use bson::{Bson, Document};

use crate::{
    access::StoreAccess,
    compiler::Plan,
    error::AdapterResult,
    find::{FindManyOptions, find_many, find_one},
    naming::FieldMapper,
    predicate::{ID_FIELD, Predicate, key_from_value},
    record::Record,
};

/// Creates a record.
///
/// A non-empty `id` in `data` becomes the document key; otherwise the store
/// generates one. When the store reads its own writes the stored document is
/// merged over the input, stored values winning.
pub async fn create<A>(
    access: &mut A,
    collection: &str,
    mut data: Document,
    mapper: &FieldMapper,
) -> AdapterResult<Record>
where
    A: StoreAccess + ?Sized,
{
    let key = match data.remove(ID_FIELD) {
        None | Some(Bson::Null) => access.generate_key(),
        Some(Bson::String(id)) if id.is_empty() => access.generate_key(),
        Some(value) => key_from_value(&value)?,
    };

    access.set(collection, &key, to_storage(&data, mapper)).await?;
    let input = Record::new(key, data);

    if !access.reads_own_writes() {
        return Ok(input);
    }

    Ok(match access.get(collection, &input.id).await? {
        Some(stored) => match Record::materialize(stored, mapper) {
            Some(stored) => input.merged_with(stored.fields),
            None => input,
        },
        None => input,
    })
}

/// Updates the first record matching `predicates`.
///
/// Returns `None` when nothing matches. Outside a transaction the returned record
/// is re-read from the store; inside one it is the existing record merged with
/// the patch.
pub async fn update<A>(
    access: &mut A,
    collection: &str,
    predicates: &[Predicate],
    mut patch: Document,
    mapper: &FieldMapper,
) -> AdapterResult<Option<Record>>
where
    A: StoreAccess + ?Sized,
{
    let Some(existing) = find_one(access, collection, predicates, mapper).await? else {
        return Ok(None);
    };

    patch.remove(ID_FIELD);
    access.update(collection, &existing.id, to_storage(&patch, mapper)).await?;

    if !access.reads_own_writes() {
        return Ok(Some(existing.merged_with(patch)));
    }

    Ok(access
        .get(collection, &existing.id)
        .await?
        .and_then(|document| Record::materialize(document, mapper)))
}

/// Deletes the first record matching `predicates` and returns it. No match is a
/// no-op.
pub async fn delete<A>(
    access: &mut A,
    collection: &str,
    predicates: &[Predicate],
    mapper: &FieldMapper,
) -> AdapterResult<Option<Record>>
where
    A: StoreAccess + ?Sized,
{
    let existing = find_one(access, collection, predicates, mapper).await?;
    if let Some(existing) = &existing {
        access.delete(collection, &existing.id).await?;
    }

    Ok(existing)
}

/// Applies `patch` to every record the plan matches and returns how many were
/// updated.
pub async fn update_many<A>(
    access: &mut A,
    collection: &str,
    plan: &Plan,
    mut patch: Document,
    mapper: &FieldMapper,
) -> AdapterResult<u64>
where
    A: StoreAccess + ?Sized,
{
    patch.remove(ID_FIELD);
    let patch = to_storage(&patch, mapper);
    let targets = find_many(access, collection, plan, &FindManyOptions::default(), mapper).await?;

    for target in &targets {
        access.update(collection, &target.id, patch.clone()).await?;
    }

    Ok(targets.len() as u64)
}

/// Deletes every record the plan matches and returns how many were deleted.
pub async fn delete_many<A>(
    access: &mut A,
    collection: &str,
    plan: &Plan,
    mapper: &FieldMapper,
) -> AdapterResult<u64>
where
    A: StoreAccess + ?Sized,
{
    let targets = find_many(access, collection, plan, &FindManyOptions::default(), mapper).await?;

    for target in &targets {
        access.delete(collection, &target.id).await?;
    }

    Ok(targets.len() as u64)
}

/// Canonical fields to storage fields. `id` never reaches storage.
fn to_storage(fields: &Document, mapper: &FieldMapper) -> Document {
    fields
        .iter()
        .filter(|(name, _)| name.as_str() != ID_FIELD)
        .map(|(name, value)| (mapper.to_db(name).to_string(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingStrategy;
    use bson::doc;

    #[test]
    fn storage_documents_use_mapped_names_and_keep_nulls() {
        let mapper = FieldMapper::new(NamingStrategy::SnakeCase);
        let stored = to_storage(
            &doc! { "id": "x", "userId": "u1", "image": Bson::Null, "name": "Ann" },
            &mapper,
        );

        assert_eq!(stored, doc! { "user_id": "u1", "image": Bson::Null, "name": "Ann" });
    }
}
