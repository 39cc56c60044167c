//! `TypesenseIndex` against a mock Typesense server.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use recipe_catalog_core::{
    NewRecipe, RecipeAggregate, RecipeId, SearchError, SearchIndex, UserId, Utc,
};
use recipe_catalog_search::{TypesenseConfig, TypesenseIndex};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn index(server: &MockServer) -> TypesenseIndex {
    TypesenseIndex::new(TypesenseConfig::new(server.uri(), KEY))
}

fn hit(id: &str, name: &str) -> serde_json::Value {
    json!({
        "document": {
            "id": id,
            "name": name,
            "descr": "",
            "diff": "easy",
            "filters": ["dinner"],
            "imgs": "{}",
            "authorid": "1",
            "ingredients": "{}",
            "steps": "{}",
            "review_count": 2,
            "avg_rating": 4.5
        }
    })
}

#[tokio::test]
async fn existing_collection_is_left_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/recipes"))
        .and(header("X-TYPESENSE-API-KEY", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "recipes"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    index(&server).ensure_collection().await.unwrap();
}

#[tokio::test]
async fn missing_collection_is_created() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/recipes"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .and(body_partial_json(json!({"name": "recipes"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    index(&server).ensure_collection().await.unwrap();
}

#[tokio::test]
async fn recipe_is_upserted_as_flat_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/recipes/documents"))
        .and(query_param("action", "upsert"))
        .and(body_partial_json(json!({
            "id": "7",
            "name": "Plov",
            "authorid": "3",
            "ingredients": "{\"rice\":\"1kg\"}"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut new = NewRecipe {
        name: "Plov".to_string(),
        author_id: UserId::new(3),
        ..NewRecipe::default()
    };
    new.ingredients.insert("rice".to_string(), "1kg".to_string());
    let recipe = new.into_recipe(RecipeId::new(7), Utc::now());

    index(&server).index_recipe(&recipe).await.unwrap();
}

#[tokio::test]
async fn aggregate_is_patched_onto_document() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/collections/recipes/documents/7"))
        .and(body_json(json!({"review_count": 3, "avg_rating": 4.0})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    index(&server)
        .update_aggregate(RecipeId::new(7), RecipeAggregate::from_ratings([5, 3, 4]))
        .await
        .unwrap();
}

#[tokio::test]
async fn search_queries_text_fields_and_returns_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/recipes/documents/search"))
        .and(query_param("q", "plov"))
        .and(query_param("query_by", "name,descr,ingredients,steps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "found": 2,
            "hits": [hit("2", "Plov"), hit("9", "Wedding plov")]
        })))
        .mount(&server)
        .await;

    let docs = index(&server).search("plov").await.unwrap();

    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Plov", "Wedding plov"]);
    assert_eq!(docs[0].review_count, 2);
}

#[tokio::test]
async fn filter_matches_any_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/recipes/documents/search"))
        .and(query_param("q", "*"))
        .and(query_param("query_by", "filters"))
        .and(query_param("filter_by", "filters:[`dinner`,`vegan`]"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"found": 1, "hits": [hit("4", "Dal")]})),
        )
        .mount(&server)
        .await;

    let docs = index(&server)
        .filter(&["dinner".to_string(), "vegan".to_string()])
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "4");
}

#[tokio::test]
async fn error_status_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/recipes/documents/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = index(&server).search("x").await.unwrap_err();

    assert_eq!(
        err,
        SearchError::Status {
            status: 503,
            body: "overloaded".to_string()
        }
    );
}

#[tokio::test]
async fn malformed_response_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/recipes/documents/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = index(&server).search("x").await.unwrap_err();

    assert!(matches!(err, SearchError::Serialization(_)));
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    // Reserve a free port, then release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let index = TypesenseIndex::new(TypesenseConfig::new(format!("http://{addr}"), KEY));
    let err = index.search("x").await.unwrap_err();

    assert!(matches!(err, SearchError::Http(_)));
}
