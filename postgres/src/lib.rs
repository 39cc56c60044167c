//! `PostgreSQL` storage for the recipe catalog.
//!
//! [`PostgresCatalogStore`] implements both [`RecipeStore`] and [`ReviewStore`]
//! from `recipe-catalog-core` on top of a sqlx connection pool:
//!
//! - Review insert and aggregate recompute as separate statements
//! - Aggregate recompute as a single `UPDATE ... RETURNING` over `reviews`
//! - Newest-first paging with `LIMIT`/`OFFSET`
//! - JSONB columns for filters, images, ingredients and steps
//!
//! # Example
//!
//! ```ignore
//! use recipe_catalog_postgres::PostgresCatalogStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresCatalogStore::connect("postgres://localhost/recipes", 10).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Schema
//!
//! The store expects `users(id, username)`, `recipes(id, name, descr, diff,
//! filters, imgs, ingredients, steps, author_id, review_count, avg_rating,
//! created_at)` and `reviews(id, review_text, rating_value, author_id,
//! recipe_id)`. Creating them is left to the deployment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use recipe_catalog_core::{
    NewRecipe, NewReview, Recipe, RecipeAggregate, RecipeId, RecipeStore, Review, ReviewId,
    ReviewStore, StoreError, StoreFuture, UserId, page_offset,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

const RECIPE_COLUMNS: &str = r"
    r.id, r.name, r.descr, r.diff, r.filters, r.imgs, r.ingredients, r.steps,
    r.author_id, u.username, r.review_count, r.avg_rating, r.created_at
";

/// Recipe and review storage backed by a `PostgreSQL` pool.
#[derive(Clone, Debug)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot connect.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, e.g. for readiness probes.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_review_row(&self, review: &NewReview) -> Result<ReviewId, StoreError> {
        let (id,): (i64,) = timed(
            "insert_review",
            sqlx::query_as(
                r"
                INSERT INTO reviews (review_text, rating_value, author_id, recipe_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                ",
            )
            .bind(&review.text)
            .bind(review.rating_value)
            .bind(review.author_id.get())
            .bind(review.recipe_id.get())
            .fetch_one(&self.pool),
        )
        .await
        .map_err(|e| insert_error(&e, review.recipe_id))?;

        Ok(ReviewId::new(id))
    }

    async fn reviews_by_recipe(&self, recipe_id: RecipeId) -> Result<Vec<Review>, StoreError> {
        let rows = timed(
            "select_reviews",
            sqlx::query(
                r"
                SELECT id, review_text, rating_value, author_id, recipe_id
                FROM reviews
                WHERE recipe_id = $1
                ORDER BY id ASC
                ",
            )
            .bind(recipe_id.get())
            .fetch_all(&self.pool),
        )
        .await
        .map_err(database)?;

        rows.iter().map(row_to_review).collect()
    }

    async fn recompute(&self, recipe_id: RecipeId) -> Result<RecipeAggregate, StoreError> {
        // Count and mean come from the same snapshot of `reviews`.
        let row = timed(
            "recompute_aggregate",
            sqlx::query(
                r"
                UPDATE recipes
                SET review_count = (SELECT COUNT(*) FROM reviews WHERE recipe_id = $1)::INTEGER,
                    avg_rating = (
                        SELECT COALESCE(AVG(rating_value), 0) FROM reviews WHERE recipe_id = $1
                    )::DOUBLE PRECISION
                WHERE id = $1
                RETURNING review_count, avg_rating
                ",
            )
            .bind(recipe_id.get())
            .fetch_optional(&self.pool),
        )
        .await
        .map_err(database)?
        .ok_or_else(|| StoreError::NotFound(format!("recipe {recipe_id}")))?;

        Ok(RecipeAggregate {
            review_count: review_count(&row)?,
            avg_rating: row.try_get("avg_rating").map_err(database)?,
        })
    }

    async fn recipes_page(&self, page: u32, page_size: u32) -> Result<Vec<Recipe>, StoreError> {
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN users u ON r.author_id = u.id \
             ORDER BY r.id DESC LIMIT $1 OFFSET $2"
        );
        let (limit, offset) = limit_offset(page, page_size)?;

        let rows = timed(
            "select_recipes_page",
            sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(database)?;

        rows.iter().map(row_to_recipe).collect()
    }

    async fn recipe_by_id(&self, recipe_id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN users u ON r.author_id = u.id \
             WHERE r.id = $1"
        );

        let row = timed(
            "select_recipe",
            sqlx::query(&sql)
                .bind(recipe_id.get())
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(database)?;

        row.as_ref().map(row_to_recipe).transpose()
    }

    async fn insert_recipe_row(&self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        let sql = format!(
            r"
            WITH r AS (
                INSERT INTO recipes (name, descr, diff, filters, imgs, ingredients, steps, author_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT {RECIPE_COLUMNS} FROM r LEFT JOIN users u ON r.author_id = u.id
            "
        );

        let row = timed(
            "insert_recipe",
            sqlx::query(&sql)
                .bind(&recipe.name)
                .bind(&recipe.description)
                .bind(&recipe.difficulty)
                .bind(Json(&recipe.filters))
                .bind(Json(&recipe.images))
                .bind(Json(&recipe.ingredients))
                .bind(Json(&recipe.steps))
                .bind(recipe.author_id.get())
                .fetch_one(&self.pool),
        )
        .await
        .map_err(database)?;

        let stored = row_to_recipe(&row)?;
        tracing::debug!(recipe_id = %stored.id, author_id = %stored.author_id, "Recipe inserted");
        Ok(stored)
    }

    async fn recipes_by_author(
        &self,
        author_id: UserId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Recipe>, StoreError> {
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN users u ON r.author_id = u.id \
             WHERE r.author_id = $1 ORDER BY r.id DESC LIMIT $2 OFFSET $3"
        );
        let (limit, offset) = limit_offset(page, page_size)?;

        let rows = timed(
            "select_recipes_by_author",
            sqlx::query(&sql)
                .bind(author_id.get())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(database)?;

        rows.iter().map(row_to_recipe).collect()
    }
}

impl ReviewStore for PostgresCatalogStore {
    fn insert_review<'a>(&'a self, review: &'a NewReview) -> StoreFuture<'a, ReviewId> {
        Box::pin(self.insert_review_row(review))
    }

    fn select_reviews_by_recipe(&self, recipe_id: RecipeId) -> StoreFuture<'_, Vec<Review>> {
        Box::pin(self.reviews_by_recipe(recipe_id))
    }
}

impl RecipeStore for PostgresCatalogStore {
    fn recompute_aggregate(&self, recipe_id: RecipeId) -> StoreFuture<'_, RecipeAggregate> {
        Box::pin(self.recompute(recipe_id))
    }

    fn select_recipes_page(&self, page: u32, page_size: u32) -> StoreFuture<'_, Vec<Recipe>> {
        Box::pin(self.recipes_page(page, page_size))
    }

    fn select_recipe_by_id(&self, recipe_id: RecipeId) -> StoreFuture<'_, Option<Recipe>> {
        Box::pin(self.recipe_by_id(recipe_id))
    }

    fn insert_recipe<'a>(&'a self, recipe: &'a NewRecipe) -> StoreFuture<'a, Recipe> {
        Box::pin(self.insert_recipe_row(recipe))
    }

    fn select_recipes_by_author(
        &self,
        author_id: UserId,
        page: u32,
        page_size: u32,
    ) -> StoreFuture<'_, Vec<Recipe>> {
        Box::pin(self.recipes_by_author(author_id, page, page_size))
    }
}

/// Await a query and record its latency under `op`.
async fn timed<T>(op: &'static str, query: impl Future<Output = T>) -> T {
    let start = Instant::now();
    let out = query.await;
    metrics::histogram!("postgres_query_duration_seconds", "op" => op)
        .record(start.elapsed().as_secs_f64());
    out
}

#[allow(clippy::needless_pass_by_value)] // Used as a map_err adapter
fn database(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// A review pointing at a missing recipe trips the foreign key.
fn insert_error(e: &sqlx::Error, recipe_id: RecipeId) -> StoreError {
    match e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::NotFound(format!("recipe {recipe_id}"))
        }
        _ => StoreError::Database(e.to_string()),
    }
}

fn limit_offset(page: u32, page_size: u32) -> Result<(i64, i64), StoreError> {
    let offset = i64::try_from(page_offset(page, page_size))
        .map_err(|_| StoreError::Database(format!("page {page} is out of range")))?;
    Ok((i64::from(page_size), offset))
}

fn review_count(row: &PgRow) -> Result<u32, StoreError> {
    let count: i32 = row.try_get("review_count").map_err(database)?;
    u32::try_from(count)
        .map_err(|_| StoreError::Serialization(format!("negative review_count {count}")))
}

fn row_to_review(row: &PgRow) -> Result<Review, StoreError> {
    Ok(Review {
        id: ReviewId::new(row.try_get("id").map_err(database)?),
        text: row.try_get("review_text").map_err(database)?,
        rating_value: row.try_get("rating_value").map_err(database)?,
        recipe_id: RecipeId::new(row.try_get("recipe_id").map_err(database)?),
        author_id: UserId::new(row.try_get("author_id").map_err(database)?),
    })
}

fn json_column<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: serde::de::DeserializeOwned + Default,
    Json<T>: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    let value: Option<Json<T>> = row
        .try_get(column)
        .map_err(|e| StoreError::Serialization(format!("{column}: {e}")))?;
    Ok(value.map(|Json(inner)| inner).unwrap_or_default())
}

fn row_to_recipe(row: &PgRow) -> Result<Recipe, StoreError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(database)?;

    Ok(Recipe {
        id: RecipeId::new(row.try_get("id").map_err(database)?),
        name: row.try_get("name").map_err(database)?,
        description: row
            .try_get::<Option<String>, _>("descr")
            .map_err(database)?
            .unwrap_or_default(),
        difficulty: row
            .try_get::<Option<String>, _>("diff")
            .map_err(database)?
            .unwrap_or_default(),
        filters: json_column::<Vec<String>>(row, "filters")?,
        images: json_column::<BTreeMap<String, String>>(row, "imgs")?,
        ingredients: json_column::<BTreeMap<String, String>>(row, "ingredients")?,
        steps: json_column::<BTreeMap<String, String>>(row, "steps")?,
        author_id: UserId::new(row.try_get("author_id").map_err(database)?),
        author_name: row.try_get("username").map_err(database)?,
        review_count: review_count(row)?,
        avg_rating: row.try_get("avg_rating").map_err(database)?,
        created_at,
        reviews: Vec::new(),
    })
}
