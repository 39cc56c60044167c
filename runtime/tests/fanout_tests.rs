//! Read fan-out: isolation, ordering and bounded width.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use recipe_catalog_core::{Recipe, RecipeStore, UserId};
use recipe_catalog_runtime::{CancelToken, FanoutConfig, ReviewAssembler};
use recipe_catalog_testing::{InMemoryCatalogStore, new_recipe, review};
use std::sync::Arc;
use std::time::Duration;

/// Seed `n` recipes where recipe `i` (1-based) has `i` reviews.
fn seeded(n: usize) -> (Arc<InMemoryCatalogStore>, Vec<Recipe>) {
    recipe_catalog_testing::init_tracing();
    let store = Arc::new(InMemoryCatalogStore::new());
    let recipes: Vec<Recipe> = (1..=n)
        .map(|i| {
            let recipe = store.seed_recipe(new_recipe(&format!("recipe {i}"), UserId::new(1)));
            for _ in 0..i {
                store.seed_review(&review(recipe.id, 4));
            }
            recipe
        })
        .collect();
    (store, recipes)
}

fn assembler(store: &Arc<InMemoryCatalogStore>, config: FanoutConfig) -> ReviewAssembler {
    ReviewAssembler::new(store.clone(), config)
}

#[tokio::test]
async fn every_recipe_gets_its_own_reviews_in_input_order() {
    let (store, recipes) = seeded(6);
    let input: Vec<Recipe> = recipes.iter().rev().cloned().collect();
    let expected_ids: Vec<_> = input.iter().map(|r| r.id).collect();

    let out = assembler(&store, FanoutConfig::default())
        .assemble(input, &CancelToken::new())
        .await;

    let ids: Vec<_> = out.iter().map(|r| r.id).collect();
    assert_eq!(ids, expected_ids);
    for recipe in &out {
        let expected = usize::try_from(recipe.id.get()).unwrap();
        assert_eq!(recipe.reviews.len(), expected);
        assert!(recipe.reviews.iter().all(|r| r.recipe_id == recipe.id));
    }
}

#[tokio::test]
async fn one_failed_fetch_leaves_only_that_recipe_empty() {
    let (store, recipes) = seeded(5);
    let broken = recipes[2].id;
    store.fail_fetch_for(broken);

    let out = assembler(&store, FanoutConfig::default())
        .assemble(recipes.clone(), &CancelToken::new())
        .await;

    assert_eq!(out.len(), 5);
    for recipe in &out {
        if recipe.id == broken {
            assert!(recipe.reviews.is_empty());
        } else {
            assert_eq!(recipe.reviews.len(), store.reviews_for(recipe.id).len());
        }
    }
}

#[tokio::test]
async fn slow_fetch_times_out_without_failing_the_page() {
    let (store, recipes) = seeded(3);
    let stuck = recipes[0].id;
    store.hang_fetch_for(stuck);

    let config = FanoutConfig {
        max_concurrent: 4,
        fetch_timeout: Duration::from_millis(50),
    };
    let out = tokio::time::timeout(
        Duration::from_secs(5),
        assembler(&store, config).assemble(recipes, &CancelToken::new()),
    )
    .await
    .expect("assemble must not wait past the fetch timeout");

    assert!(out[0].reviews.is_empty());
    assert_eq!(out[1].reviews.len(), 2);
    assert_eq!(out[2].reviews.len(), 3);
    assert_eq!(store.in_flight_fetches(), 0);
}

#[tokio::test]
async fn in_flight_fetches_never_exceed_max_concurrent() {
    let (store, recipes) = seeded(20);
    store.set_fetch_delay(Duration::from_millis(20));

    let config = FanoutConfig {
        max_concurrent: 3,
        fetch_timeout: Duration::from_secs(5),
    };
    let out = assembler(&store, config)
        .assemble(recipes, &CancelToken::new())
        .await;

    assert_eq!(out.len(), 20);
    assert!(out.iter().all(|r| !r.reviews.is_empty()));
    assert_eq!(store.fetch_calls(), 20);
    let peak = store.max_in_flight_fetches();
    assert!(peak <= 3, "peak in-flight fetches was {peak}");
    assert!(peak >= 2, "fetches should overlap, peak was {peak}");
}

#[tokio::test]
async fn cancellation_returns_recipes_without_reviews() {
    let (store, recipes) = seeded(4);
    store.hang_fetch_for(recipes[1].id);
    store.hang_fetch_for(recipes[3].id);

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let config = FanoutConfig {
        max_concurrent: 4,
        fetch_timeout: Duration::from_secs(60),
    };
    let out = tokio::time::timeout(
        Duration::from_secs(5),
        assembler(&store, config).assemble(recipes, &cancel),
    )
    .await
    .expect("cancellation must release the page");

    assert_eq!(out[0].reviews.len(), 1);
    assert!(out[1].reviews.is_empty());
    assert_eq!(out[2].reviews.len(), 3);
    assert!(out[3].reviews.is_empty());
}

#[tokio::test]
async fn already_cancelled_token_attaches_no_reviews() {
    let (store, recipes) = seeded(5);
    let cancel = CancelToken::new();
    cancel.cancel();
    let assembler = assembler(&store, FanoutConfig::default());

    for _ in 0..50 {
        let out = assembler.assemble(recipes.clone(), &cancel).await;
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|r| r.reviews.is_empty()));
    }
}

#[tokio::test]
async fn empty_page_makes_no_fetches() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let out = assembler(&store, FanoutConfig::default())
        .assemble(Vec::new(), &CancelToken::new())
        .await;
    assert!(out.is_empty());
    assert_eq!(store.fetch_calls(), 0);
}

#[tokio::test]
async fn page_from_store_is_assembled_newest_first() {
    let (store, _) = seeded(5);
    let page = store.select_recipes_page(1, 2).await.unwrap();

    let out = assembler(&store, FanoutConfig::default())
        .assemble(page, &CancelToken::new())
        .await;

    let ids: Vec<i64> = out.iter().map(|r| r.id.get()).collect();
    assert_eq!(ids, vec![5, 4]);
    assert_eq!(out[0].reviews.len(), 5);
    assert_eq!(out[1].reviews.len(), 4);
}
