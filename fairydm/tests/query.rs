use bson::{Bson, doc};
use fairydm::{memory::InMemoryStore, prelude::*};

fn person_schema() -> Schema {
    let address = Schema::builder()
        .field("street", Field::string())
        .field("city", Field::string().required())
        .build();

    Schema::builder()
        .field("name", Field::string().required())
        .field("age", Field::number())
        .field("tags", Field::array(FieldKind::String))
        .field("address", Field::schema(address))
        .build()
}

async fn people() -> Model<bson::Document> {
    let store = DocumentStore::new();
    store.connect(InMemoryStore::builder()).await.unwrap();
    let people: Model<bson::Document> = ModelRegistry::new(store).register("QueryUser", person_schema());

    people
        .create(doc! {
            "name": "Alice",
            "age": 25,
            "tags": ["admin", "staff"],
            "address": { "street": "1 Main St", "city": "Anytown" },
        })
        .await
        .unwrap();
    people
        .create(doc! {
            "name": "Bob",
            "age": 30,
            "tags": ["staff"],
            "address": { "street": "2 Side St", "city": "Othertown" },
        })
        .await
        .unwrap();
    people
        .create(doc! {
            "name": "Carol",
            "age": 35,
            "tags": [],
            "address": { "city": "Anytown" },
        })
        .await
        .unwrap();

    people
}

async fn names(people: &Model<bson::Document>, filter: impl Into<Filter>) -> Vec<String> {
    let mut names: Vec<String> = people
        .find(filter)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|person| person.data.get_str("name").ok().map(str::to_string))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn comparison_operators() {
    let people = people().await;

    assert_eq!(names(&people, doc! { "age": { "$gt": 30 } }).await, ["Carol"]);
    assert_eq!(names(&people, doc! { "age": { "$gte": 30 } }).await, ["Bob", "Carol"]);
    assert_eq!(names(&people, doc! { "age": { "$lt": 30 } }).await, ["Alice"]);
    assert_eq!(names(&people, doc! { "age": { "$lte": 30 } }).await, ["Alice", "Bob"]);
    assert_eq!(names(&people, doc! { "age": { "$eq": 30 } }).await, ["Bob"]);
    assert_eq!(names(&people, doc! { "age": { "$ne": 30 } }).await, ["Alice", "Carol"]);
}

#[tokio::test]
async fn membership_operators() {
    let people = people().await;

    assert_eq!(names(&people, doc! { "age": { "$in": [25, 35] } }).await, ["Alice", "Carol"]);
    assert_eq!(names(&people, doc! { "age": { "$nin": [25, 35] } }).await, ["Bob"]);
}

#[tokio::test]
async fn array_operators() {
    let people = people().await;

    assert_eq!(
        names(&people, doc! { "tags": { "$array_contains": "staff" } }).await,
        ["Alice", "Bob"]
    );
    assert_eq!(
        names(&people, doc! { "tags": { "$array_contains_any": ["admin", "guest"] } }).await,
        ["Alice"]
    );
}

#[tokio::test]
async fn operators_on_one_field_combine() {
    let people = people().await;

    assert_eq!(names(&people, doc! { "age": { "$gt": 25, "$lt": 35 } }).await, ["Bob"]);
    assert_eq!(
        names(&people, Filter::new().op("age", Operator::Gte, 30).op("age", Operator::Ne, 35)).await,
        ["Bob"]
    );
}

#[tokio::test]
async fn unknown_operators_are_ignored() {
    let people = people().await;

    assert_eq!(
        names(&people, doc! { "age": { "$gt": 25, "$regex": "3.*" } }).await,
        ["Bob", "Carol"]
    );
}

#[tokio::test]
async fn literal_and_nested_equality() {
    let people = people().await;

    assert_eq!(names(&people, doc! { "name": "Alice" }).await, ["Alice"]);
    assert_eq!(
        names(&people, doc! { "address": { "city": "Anytown" } }).await,
        ["Alice", "Carol"]
    );
    assert_eq!(names(&people, doc! { "address.city": "Othertown" }).await, ["Bob"]);
    assert_eq!(
        names(&people, Filter::new().nested("address", Filter::new().eq("city", "Anytown")).eq("age", 35)).await,
        ["Carol"]
    );
}

#[tokio::test]
async fn not_equal_skips_documents_without_the_field() {
    let people = people().await;
    people.create(doc! { "name": "Dave" }).await.unwrap();

    assert_eq!(names(&people, doc! { "age": { "$ne": 30 } }).await, ["Alice", "Carol"]);
    assert_eq!(names(&people, doc! { "age": { "$nin": [30] } }).await, ["Alice", "Carol"]);
    assert_eq!(names(&people, doc! {}).await.len(), 4);
}

#[tokio::test]
async fn identifier_queries() {
    let people = people().await;
    let bob = people.find_one(doc! { "name": "Bob" }).await.unwrap().unwrap();
    let id = bob.id().unwrap();

    assert_eq!(names(&people, doc! { "_id": id }).await, ["Bob"]);
    assert_eq!(names(&people, doc! { "_id": id.to_string() }).await, ["Bob"]);
    assert_eq!(names(&people, Filter::new().id(id)).await, ["Bob"]);
    assert_eq!(names(&people, doc! { "_id": { "$ne": id } }).await, ["Alice", "Carol"]);
}

#[tokio::test]
async fn find_one_returns_a_single_match_or_none() {
    let people = people().await;

    let found = people.find_one(doc! { "age": { "$gte": 25 } }).await.unwrap();
    assert!(found.is_some());
    assert!(people.find_one(doc! { "age": { "$gt": 100 } }).await.unwrap().is_none());
}

#[tokio::test]
async fn mismatched_types_never_match_comparisons() {
    let people = people().await;

    assert!(names(&people, doc! { "age": { "$gt": "20" } }).await.is_empty());
    assert!(names(&people, doc! { "age": Bson::Null }).await.is_empty());
}

#[tokio::test]
async fn malformed_operands_surface_as_errors() {
    let people = people().await;

    let err = people.find(doc! { "age": { "$in": 25 } }).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Backend(_)));
}

#[tokio::test]
async fn dotted_update_keys_set_nested_fields() {
    let people = people().await;

    let result = people
        .update_many(doc! { "name": "Alice" }, doc! { "address.city": "Newtown" })
        .await
        .unwrap();
    assert_eq!(result.modified_count, 1);

    let alice = people.find_one(doc! { "name": "Alice" }).await.unwrap().unwrap();
    assert_eq!(
        alice.data.get_document("address").unwrap(),
        &doc! { "street": "1 Main St", "city": "Newtown" }
    );
    assert_eq!(names(&people, doc! { "address.city": "Anytown" }).await, ["Carol"]);
}
