//! Recipe listing, lookup and creation.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use recipe_catalog_core::{
    NewRecipe, Recipe, RecipeId, UserId, ValidationError, MAX_RECIPE_IMAGES,
};
use recipe_catalog_runtime::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `?page=&page_size=` query, both optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number, default 1
    pub page: Option<u32>,
    /// Recipes per page, default 10
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,
}

impl PageParams {
    fn resolve(self) -> (u32, u32) {
        (
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// One page of assembled recipes.
#[derive(Debug, Clone, Serialize)]
pub struct RecipePage {
    /// Page number served
    pub page: u32,
    /// Requested page size
    pub page_size: u32,
    /// Recipes, newest first, with reviews attached
    pub recipes: Vec<Recipe>,
}

/// `GET /recipes?page=&page_size=`
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> WebResult<Json<RecipePage>> {
    let (page, page_size) = params.resolve();
    let recipes = state.catalog.list_recipes(page, page_size).await?;
    Ok(Json(RecipePage {
        page,
        page_size,
        recipes,
    }))
}

/// `GET /recipes/:id`
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> WebResult<Json<Recipe>> {
    let id = recipe_id(id)?;
    Ok(Json(state.catalog.get_recipe(id).await?))
}

/// `GET /authors/:id/recipes?page=&page_size=`
pub async fn recipes_by_author(
    State(state): State<AppState>,
    Path(author_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> WebResult<Json<RecipePage>> {
    let (page, page_size) = params.resolve();
    let recipes = state
        .catalog
        .recipes_by_author(UserId::new(author_id), page, page_size)
        .await?;
    Ok(Json(RecipePage {
        page,
        page_size,
        recipes,
    }))
}

/// `POST /recipes` as `multipart/form-data`.
///
/// Text fields: `name`, `descr`, `diff`, `authorID`, and JSON-encoded
/// `filters` (array), `ingredients` and `steps` (objects). Up to three
/// files under `images`, stored as slots `"1"`..`"3"`.
///
/// The recipe is validated before any image touches the disk.
pub async fn create_recipe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> WebResult<(StatusCode, Json<Recipe>)> {
    let mut form = RecipeForm::default();
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" {
            if uploads.len() == MAX_RECIPE_IMAGES {
                return Err(ValidationError::TooManyImages {
                    count: uploads.len() + 1,
                    max: MAX_RECIPE_IMAGES,
                }
                .into());
            }
            let file_name = field.file_name().unwrap_or("image").to_string();
            let bytes = field.bytes().await?;
            uploads.push((file_name, bytes.to_vec()));
        } else {
            let value = field.text().await?;
            form.set(&name, value);
        }
    }

    let mut recipe = form.into_new_recipe()?;
    recipe.validate()?;

    for (slot, (file_name, bytes)) in uploads.into_iter().enumerate() {
        let path = state
            .images
            .save(recipe.author_id, &file_name, bytes)
            .await?;
        recipe.images.insert((slot + 1).to_string(), path);
    }

    let created = state.catalog.create_recipe(recipe).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Raw text fields of the creation form.
#[derive(Debug, Default)]
struct RecipeForm {
    name: String,
    descr: String,
    diff: String,
    author_id: Option<String>,
    filters: Option<String>,
    ingredients: Option<String>,
    steps: Option<String>,
}

impl RecipeForm {
    fn set(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = value,
            "descr" | "description" => self.descr = value,
            "diff" | "difficulty" => self.diff = value,
            "authorID" | "author_id" => self.author_id = Some(value),
            "filters" => self.filters = Some(value),
            "ingredients" => self.ingredients = Some(value),
            "steps" => self.steps = Some(value),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    fn into_new_recipe(self) -> Result<NewRecipe, AppError> {
        let author = self
            .author_id
            .ok_or_else(|| AppError::from(ValidationError::MissingField("authorID".to_string())))?;
        let author_id = author
            .trim()
            .parse::<UserId>()
            .map_err(|e| AppError::validation(e.to_string()))?;

        Ok(NewRecipe {
            name: self.name,
            description: self.descr,
            difficulty: self.diff,
            filters: json_field("filters", self.filters.as_deref())?,
            images: BTreeMap::new(),
            ingredients: json_field("ingredients", self.ingredients.as_deref())?,
            steps: json_field("steps", self.steps.as_deref())?,
            author_id,
        })
    }
}

fn json_field<T>(field: &str, raw: Option<&str>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::bad_request(format!("Invalid {field} format: {e}"))),
    }
}

pub(crate) fn recipe_id(raw: i64) -> Result<RecipeId, AppError> {
    let id = RecipeId::new(raw);
    if id.is_valid() {
        Ok(id)
    } else {
        Err(ValidationError::InvalidId {
            field: "recipe_id",
            value: raw,
        }
        .into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn page_params_default_to_first_page_of_ten() {
        assert_eq!(PageParams::default().resolve(), (1, 10));
        let params = PageParams {
            page: Some(3),
            page_size: Some(25),
        };
        assert_eq!(params.resolve(), (3, 25));
    }

    #[test]
    fn form_parses_json_fields() {
        let mut form = RecipeForm::default();
        form.set("name", "Plov".to_string());
        form.set("authorID", "4".to_string());
        form.set("filters", r#"["dinner","rice"]"#.to_string());
        form.set("ingredients", r#"{"rice":"1kg"}"#.to_string());

        let recipe = form.into_new_recipe().unwrap();

        assert_eq!(recipe.author_id, UserId::new(4));
        assert_eq!(recipe.filters, vec!["dinner", "rice"]);
        assert_eq!(recipe.ingredients.get("rice").unwrap(), "1kg");
        assert!(recipe.steps.is_empty());
    }

    #[test]
    fn form_without_author_is_rejected() {
        let mut form = RecipeForm::default();
        form.set("name", "Plov".to_string());

        let err = form.into_new_recipe().unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn malformed_json_field_is_bad_request() {
        let mut form = RecipeForm::default();
        form.set("authorID", "1".to_string());
        form.set("steps", "{not json".to_string());

        let err = form.into_new_recipe().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_positive_recipe_id_is_rejected() {
        assert!(recipe_id(1).is_ok());
        assert_eq!(recipe_id(0).unwrap_err().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
