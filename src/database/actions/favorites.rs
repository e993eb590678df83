use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    database::error::QueryError,
    database::pagination::PageContext,
    database::schema::{RecipeRow, RecipeShortInfo},
    error::{ApiError, Error},
    jwt::SessionData,
};

use super::recipes::get_recipe;

pub async fn is_favorite(
    recipe_id: i32,
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(i32,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM favorite_entries WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn fetch_favorites(
    user_id: i32,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let rows: Vec<RecipeRow> = sqlx::query_as(
        "
        SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date, COUNT(*) OVER() AS count
        FROM favorite_entries f
        INNER JOIN recipes r ON r.id = f.recipe_id
        WHERE f.user_id = $1
        ORDER BY f.created DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(RECIPE_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);

    Ok(page)
}

/// Adds a recipe to the caller's favorites. The unique (user, recipe)
/// constraint arbitrates concurrent adds; the loser gets a conflict error.
pub async fn add_favorite(
    recipe_id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShortInfo, Error> {
    session.authenticate(ActionType::ManageOwnFavorites)?;

    let recipe = match get_recipe(recipe_id, pool).await? {
        Some(recipe) => recipe,
        None => return Err(ApiError::NotFound.new("No recipe exists with specified id")),
    };

    let result = sqlx::query(
        "INSERT INTO favorite_entries (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *;",
    )
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::Conflict.new("Recipe is already in favorites"));
    }

    Ok(RecipeShortInfo::from(&recipe))
}

/// Removes a favorite entry; removing one that does not exist is reported as
/// not-found, distinct from the duplicate-add conflict.
pub async fn remove_favorite(
    recipe_id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnFavorites)?;

    let result = sqlx::query("DELETE FROM favorite_entries WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("Recipe is not in favorites"));
    }

    Ok(())
}
