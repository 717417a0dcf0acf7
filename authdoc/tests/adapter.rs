use authdoc::{memory::InMemoryStore, prelude::*};
use bson::{Bson, Timestamp, doc};
use serde_json::json;

const STRATEGIES: [NamingStrategy; 2] = [NamingStrategy::Default, NamingStrategy::SnakeCase];

async fn adapter(strategy: NamingStrategy) -> Adapter<InMemoryStore> {
    Adapter::new(
        InMemoryStore::builder().build().await.unwrap(),
        AdapterConfig::builder().naming_strategy(strategy).build(),
    )
}

async fn seed_users(adapter: &Adapter<InMemoryStore>) {
    let users = [
        doc! { "id": "u1", "name": "Ann", "email": "ann@x.com", "age": 50, "role": "a", "status": "active" },
        doc! { "id": "u2", "name": "Bob", "email": "bob@x.com", "age": 10, "role": "b", "status": "active" },
        doc! { "id": "u3", "name": "Cid", "email": "cid@x.com", "age": 40, "role": "c", "status": "active" },
        doc! { "id": "u4", "name": "Dee", "email": "dee@x.com", "age": 20, "role": "a", "status": "inactive" },
        doc! { "id": "u5", "name": "Eve", "email": "eve@x.com", "age": 30, "role": "d", "status": "active" },
    ];

    for user in users {
        adapter.create("user", user).await.unwrap();
    }
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}

#[tokio::test]
async fn created_records_read_back_unchanged() {
    for strategy in STRATEGIES {
        let adapter = adapter(strategy).await;

        let created = adapter
            .create("user", doc! { "name": "Ann", "email": "a@x.com", "emailVerified": false })
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let found = adapter
            .find_one("user", &[Where::eq("id", created.id.as_str())], &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert_eq!(found.into_document(), doc! {
            "id": created.id.as_str(),
            "name": "Ann",
            "email": "a@x.com",
            "emailVerified": false,
        });

        let stored = adapter.backend()
            .get_document("users", &created.id)
            .await
            .unwrap()
            .unwrap();
        let verified_field = match strategy {
            NamingStrategy::Default => "emailVerified",
            NamingStrategy::SnakeCase => "email_verified",
        };
        assert_eq!(stored.data.get_bool(verified_field).ok(), Some(false));
        assert!(!stored.data.contains_key("id"));
    }
}

#[tokio::test]
async fn caller_supplied_ids_become_keys() {
    let adapter = adapter(NamingStrategy::Default).await;

    let created = adapter.create("session", doc! { "id": "s-1", "userId": "u1" }).await.unwrap();
    assert_eq!(created.id, "s-1");
    assert!(adapter.backend().get_document("sessions", "s-1").await.unwrap().is_some());

    let generated = adapter.create("session", doc! { "id": "", "userId": "u1" }).await.unwrap();
    assert_ne!(generated.id, "");
    assert_eq!(adapter.count("session", &[Where::eq("userId", "u1")]).await.unwrap(), 2);
}

#[tokio::test]
async fn mapped_fields_are_queried_by_canonical_name() {
    for strategy in STRATEGIES {
        let adapter = adapter(strategy).await;
        adapter.create("session", doc! { "userId": "u1", "sessionToken": "t1" }).await.unwrap();
        adapter.create("session", doc! { "userId": "u2", "sessionToken": "t2" }).await.unwrap();

        let sessions = adapter
            .find_many("session", &[Where::eq("userId", "u1")], &FindManyOptions::new())
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].get("sessionToken"), Some(Bson::from("t1")));
    }
}

#[tokio::test]
async fn starts_with_matches_prefixes_only() {
    let adapter = adapter(NamingStrategy::Default).await;
    for name in ["anna", "banana", "ann", "Anne"] {
        adapter.create("user", doc! { "name": name }).await.unwrap();
    }

    let found = adapter
        .find_many(
            "user",
            &[Where::starts_with("name", "ann")],
            &FindManyOptions::new().sort(SortBy::asc("name")),
        )
        .await
        .unwrap();

    let names = found
        .iter()
        .filter_map(|record| record.get("name"))
        .collect::<Vec<_>>();
    assert_eq!(names, [Bson::from("ann"), Bson::from("anna")]);

    let invalid = adapter.find_many("user", &[Where::starts_with("name", 5)], &FindManyOptions::new()).await;
    assert!(matches!(invalid, Err(AdapterError::InvalidPredicate(_))));
}

#[tokio::test]
async fn conjunctions_require_every_predicate() {
    let adapter = adapter(NamingStrategy::SnakeCase).await;
    seed_users(&adapter).await;

    let adults = adapter
        .find_many(
            "user",
            &[Where::gte("age", 18), Where::eq("status", "active")],
            &FindManyOptions::new().sort(SortBy::asc("id")),
        )
        .await
        .unwrap();

    assert_eq!(ids(&adults), ["u1", "u3", "u5"]);
}

#[tokio::test]
async fn disjunctions_merge_without_duplicates() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let predicates = [
        Where::is_in("role", vec!["a", "b"]),
        Where::eq("status", "active").or(),
    ];
    let found = adapter
        .find_many("user", &predicates, &FindManyOptions::new().sort(SortBy::asc("id")))
        .await
        .unwrap();

    assert_eq!(ids(&found), ["u1", "u2", "u3", "u4", "u5"]);
    assert_eq!(adapter.count("user", &predicates).await.unwrap(), 5);

    let narrow = [
        Where::eq("name", "Ann"),
        Where::eq("role", "a").or(),
    ];
    let found = adapter
        .find_many("user", &narrow, &FindManyOptions::new().sort(SortBy::desc("age")))
        .await
        .unwrap();
    assert_eq!(ids(&found), ["u1", "u4"]);
}

#[tokio::test]
async fn disjunctions_apply_client_side_filters_to_the_union() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let predicates = [
        Where::ends_with("email", "ann@x.com"),
        Where::eq("role", "b").or(),
    ];
    let found = adapter
        .find_many("user", &predicates, &FindManyOptions::new())
        .await
        .unwrap();

    assert_eq!(ids(&found), ["u1"]);
    assert_eq!(adapter.count("user", &predicates).await.unwrap(), 1);
}

#[tokio::test]
async fn identifier_predicates_are_honored() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let listed = adapter
        .find_many("user", &[Where::is_in("id", vec!["u3", "u1", "zz"])], &FindManyOptions::new())
        .await
        .unwrap();
    assert_eq!(ids(&listed), ["u3", "u1"]);

    let active_listed = adapter
        .find_many(
            "user",
            &[Where::is_in("id", vec!["u1", "u4"]), Where::eq("status", "active")],
            &FindManyOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&active_listed), ["u1"]);

    let excluded = adapter
        .find_many(
            "user",
            &[Where::not_in("id", vec!["u1", "u2"])],
            &FindManyOptions::new().sort(SortBy::asc("id")),
        )
        .await
        .unwrap();
    assert_eq!(ids(&excluded), ["u3", "u4", "u5"]);

    assert!(adapter.find_one("user", &[Where::eq("id", "zz")], &[]).await.unwrap().is_none());
}

#[tokio::test]
async fn counts_apply_client_side_predicates() {
    for strategy in STRATEGIES {
        let adapter = adapter(strategy).await;
        seed_users(&adapter).await;

        let excluded_roles = Where::not_in("role", vec!["a", "b"]);
        assert_eq!(adapter.count("user", &[Where::eq("status", "active")]).await.unwrap(), 4);
        assert_eq!(
            adapter.count("user", &[Where::eq("status", "active"), excluded_roles.clone()]).await.unwrap(),
            2,
        );
        assert_eq!(adapter.count("user", &[excluded_roles]).await.unwrap(), 2);
        assert_eq!(adapter.count("user", &[Where::ends_with("email", "e@x.com")]).await.unwrap(), 2);
        assert_eq!(adapter.count("user", &[]).await.unwrap(), 5);
    }
}

#[tokio::test]
async fn pagination_follows_sort_order_in_every_shape() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let options = FindManyOptions::new()
        .sort(SortBy::asc("age"))
        .limit(2)
        .offset(1);

    let shapes: [Vec<Predicate>; 3] = [
        vec![],
        vec![Where::ends_with("email", "@x.com")],
        vec![Where::gte("age", 0), Where::eq("name", "nobody").or()],
    ];

    for predicates in shapes {
        let page = adapter.find_many("user", &predicates, &options).await.unwrap();
        let ages = page
            .iter()
            .filter_map(|record| record.get("age"))
            .collect::<Vec<_>>();
        assert_eq!(ages, [Bson::Int32(20), Bson::Int32(30)]);
    }

    let unsorted = adapter
        .find_many("user", &[], &FindManyOptions::new().offset(3))
        .await
        .unwrap();
    assert_eq!(ids(&unsorted), ["u4", "u5"]);
}

#[tokio::test]
async fn descending_ties_keep_key_order_in_every_shape() {
    let adapter = adapter(NamingStrategy::Default).await;
    for (id, age) in [("a", 1), ("b", 2), ("c", 2), ("d", 2), ("e", 3)] {
        let email = format!("{id}@x.com");
        adapter
            .create("user", doc! { "id": id, "email": email, "age": age })
            .await
            .unwrap();
    }

    let options = FindManyOptions::new()
        .sort(SortBy::desc("age"))
        .limit(2)
        .offset(1);

    let shapes: [Vec<Predicate>; 3] = [
        vec![],
        vec![Where::ends_with("email", "@x.com")],
        vec![Where::gte("age", 0), Where::eq("email", "nobody").or()],
    ];

    for predicates in shapes {
        let page = adapter.find_many("user", &predicates, &options).await.unwrap();
        assert_eq!(ids(&page), ["b", "c"]);
    }
}

#[tokio::test]
async fn zero_limit_returns_every_match() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let options = FindManyOptions::new().limit(0);
    let shapes: [(Vec<Predicate>, usize); 3] = [
        (vec![], 5),
        (vec![Where::ends_with("email", "@x.com")], 5),
        (vec![Where::eq("role", "a"), Where::eq("role", "b").or()], 3),
    ];

    for (predicates, expected) in shapes {
        let found = adapter.find_many("user", &predicates, &options).await.unwrap();
        assert_eq!(found.len(), expected);
    }

    let sorted = adapter
        .find_many("user", &[], &options.clone().sort(SortBy::asc("age")).offset(3))
        .await
        .unwrap();
    assert_eq!(ids(&sorted), ["u3", "u1"]);
}

#[tokio::test]
async fn select_keeps_requested_fields() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let found = adapter
        .find_many("user", &[Where::eq("id", "u2")], &FindManyOptions::new().select(["name", "missing"]))
        .await
        .unwrap();
    assert_eq!(found[0].clone().into_document(), doc! { "id": "u2", "name": "Bob" });

    let one = adapter
        .find_one("user", &[Where::eq("email", "ann@x.com")], &["age".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.into_document(), doc! { "id": "u1", "age": 50 });
}

#[tokio::test]
async fn updates_return_the_stored_record() {
    for strategy in STRATEGIES {
        let adapter = adapter(strategy).await;
        seed_users(&adapter).await;

        let updated = adapter
            .update("user", &[Where::eq("email", "bob@x.com")], doc! { "name": "Bobby", "emailVerified": true })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, "u2");
        assert_eq!(updated.get("name"), Some(Bson::from("Bobby")));
        assert_eq!(updated.get("emailVerified"), Some(Bson::Boolean(true)));
        assert_eq!(updated.get("age"), Some(Bson::Int32(10)));

        let missing = adapter
            .update("user", &[Where::eq("id", "zz")], doc! { "name": "Nobody" })
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}

#[tokio::test]
async fn update_many_touches_only_matches() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let updated = adapter
        .update_many("user", &[Where::gte("age", 30)], doc! { "status": "archived" })
        .await
        .unwrap();
    assert_eq!(updated, 3);

    let archived = adapter
        .find_many("user", &[Where::eq("status", "archived")], &FindManyOptions::new().sort(SortBy::asc("id")))
        .await
        .unwrap();
    assert_eq!(ids(&archived), ["u1", "u3", "u5"]);
    assert_eq!(adapter.count("user", &[Where::ne("status", "archived")]).await.unwrap(), 2);
}

#[tokio::test]
async fn bulk_mutations_ignore_client_side_operators() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let updated = adapter
        .update_many(
            "user",
            &[Where::eq("status", "active"), Where::ends_with("email", "ann@x.com")],
            doc! { "flagged": true },
        )
        .await
        .unwrap();
    assert_eq!(updated, 4);

    let deleted = adapter
        .delete_many("user", &[Where::not_in("id", vec!["u1", "u2"])])
        .await
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(adapter.count("user", &[]).await.unwrap(), 2);
}

#[tokio::test]
async fn deletes_by_identifier() {
    let adapter = adapter(NamingStrategy::SnakeCase).await;
    seed_users(&adapter).await;

    adapter.delete("user", &[Where::eq("id", "u3")]).await.unwrap();
    assert!(adapter.find_one("user", &[Where::eq("id", "u3")], &[]).await.unwrap().is_none());
    assert_eq!(adapter.count("user", &[]).await.unwrap(), 4);

    adapter.delete("user", &[Where::eq("id", "zz")]).await.unwrap();
    adapter.delete("user", &[Where::eq("name", "Nobody")]).await.unwrap();
    assert_eq!(adapter.count("user", &[]).await.unwrap(), 4);

    adapter.delete("user", &[Where::eq("role", "a")]).await.unwrap();
    assert_eq!(adapter.count("user", &[Where::eq("role", "a")]).await.unwrap(), 1);
}

#[tokio::test]
async fn store_timestamps_are_normalized() {
    let adapter = Adapter::new(
        InMemoryStore::builder()
            .document("sessions", "s1", doc! {
                "userId": "u1",
                "expiresAt": Timestamp { time: 1_700_000_000, increment: 7 },
            })
            .build()
            .await
            .unwrap(),
        AdapterConfig::default(),
    );

    let session = adapter
        .find_one("session", &[Where::eq("userId", "u1")], &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.get_datetime("expiresAt").map(|at| at.timestamp()), Some(1_700_000_000));
}

#[tokio::test]
async fn collections_follow_configuration() {
    let adapter = Adapter::new(
        InMemoryStore::new(),
        AdapterConfig::builder()
            .naming_strategy(NamingStrategy::SnakeCase)
            .collections(CollectionsOverride {
                users: Some("auth_users".to_string()),
                ..Default::default()
            })
            .isolation_suffix(true)
            .build(),
    );

    assert_eq!(adapter.collection("User"), "auth_users");
    assert_eq!(adapter.collection("sessions"), "sessions_snake");
    assert_eq!(adapter.collection("verificationToken"), "verification_tokens_snake");
    assert_eq!(adapter.collection("passkey"), "passkey");

    adapter.create("user", doc! { "name": "Ann" }).await.unwrap();
    assert_eq!(adapter.backend().document_count("auth_users").await, 1);
}

#[tokio::test]
async fn framework_json_shapes_deserialize() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let predicates: Vec<Predicate> = serde_json::from_value(json!([
        { "field": "email", "operator": "ends_with", "value": "@x.com" },
        { "field": "status", "value": "inactive" },
        { "field": "name", "operator": "eq", "value": "Ann", "connector": "OR" },
    ]))
    .unwrap();
    let options: FindManyOptions = serde_json::from_value(json!({
        "sortBy": { "field": "name", "direction": "desc" },
        "limit": 5,
    }))
    .unwrap();

    let found = adapter.find_many("users", &predicates, &options).await.unwrap();
    assert_eq!(ids(&found), ["u4", "u1"]);
}

#[tokio::test]
async fn transactions_commit_on_success() {
    for strategy in STRATEGIES {
        let adapter = adapter(strategy).await;

        let user = adapter
            .transaction(|tx| Box::pin(async move {
                let user = tx.create("user", doc! { "name": "Ann" }).await?;
                tx.create("account", doc! { "userId": user.id.as_str(), "providerId": "github" }).await?;
                Ok::<_, AdapterError>(user)
            }))
            .await
            .unwrap();

        let account = adapter
            .find_one("account", &[Where::eq("userId", user.id.as_str())], &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.get("providerId"), Some(Bson::from("github")));
    }
}

#[tokio::test]
async fn transactional_updates_merge_the_patch() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;

    let updated = adapter
        .transaction(|tx| Box::pin(async move {
            tx.update("user", &[Where::eq("email", "cid@x.com")], doc! { "name": "Cyd" }).await
        }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, "u3");
    assert_eq!(updated.get("name"), Some(Bson::from("Cyd")));
    assert_eq!(updated.get("age"), Some(Bson::Int32(40)));

    let stored = adapter.find_one("user", &[Where::eq("id", "u3")], &[]).await.unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(Bson::from("Cyd")));
}

#[tokio::test]
async fn transactions_roll_back_on_error() {
    let adapter = adapter(NamingStrategy::Default).await;

    let result = adapter
        .transaction(|tx| Box::pin(async move {
            tx.create("user", doc! { "name": "Ann" }).await?;
            Err::<(), _>(AdapterError::InvalidDocument("abort".to_string()))
        }))
        .await;

    assert!(matches!(result, Err(AdapterError::InvalidDocument(message)) if message == "abort"));
    assert_eq!(adapter.count("user", &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_writes_fail_the_transaction() {
    let adapter = adapter(NamingStrategy::Default).await;
    seed_users(&adapter).await;
    let store = adapter.backend().clone();

    let result = adapter
        .transaction(|tx| Box::pin(async move {
            tx.find_one("user", &[Where::eq("id", "u1")], &[]).await?;
            tx.update("user", &[Where::eq("id", "u1")], doc! { "name": "Anna" }).await?;
            store.update_document("users", "u1", doc! { "name": "Annie" }).await?;
            Ok::<_, AdapterError>(())
        }))
        .await;

    assert!(matches!(result, Err(AdapterError::TransactionConflict(_))));
    let stored = adapter.find_one("user", &[Where::eq("id", "u1")], &[]).await.unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(Bson::from("Annie")));
}
