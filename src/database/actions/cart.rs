use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    database::error::QueryError,
    database::schema::{RecipeShortInfo, ShoppingListItem},
    error::{ApiError, Error},
    jwt::SessionData,
};

use super::recipes::get_recipe;

pub async fn is_in_cart(recipe_id: i32, user_id: i32, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(i32,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM cart_entries WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

pub async fn add_to_cart(
    recipe_id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShortInfo, Error> {
    session.authenticate(ActionType::ManageOwnCart)?;

    let recipe = match get_recipe(recipe_id, pool).await? {
        Some(recipe) => recipe,
        None => return Err(ApiError::NotFound.new("No recipe exists with specified id")),
    };

    let result = sqlx::query(
        "INSERT INTO cart_entries (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *;",
    )
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::Conflict.new("Recipe is already in the shopping cart"));
    }

    Ok(RecipeShortInfo::from(&recipe))
}

pub async fn remove_from_cart(
    recipe_id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnCart)?;

    let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("Recipe is not in the shopping cart"));
    }

    Ok(())
}

/// Aggregates the user's cart into one line per ingredient: cart entries are
/// joined to the ingredient lines of their recipes and summed. Grouping is by
/// ingredient identity, so the same name under a different unit stays a
/// separate line.
pub async fn shopping_list(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, Error> {
    let rows: Vec<ShoppingListItem> = sqlx::query_as(
        "
        SELECT i.name AS name, SUM(l.amount) AS total_amount, i.measurement_unit AS measurement_unit
        FROM cart_entries c
        INNER JOIN recipe_ingredients l ON l.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = l.ingredient_id
        WHERE c.user_id = $1
        GROUP BY i.id, i.name, i.measurement_unit
        ORDER BY i.name, i.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}
