use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    database::error::QueryError,
    database::forms::RecipeDraft,
    database::pagination::PageContext,
    database::schema::{
        Recipe, RecipeDetails, RecipeFilter, RecipeIngredientRow, RecipeRow, Tag,
    },
    error::{ApiError, Error},
    jwt::SessionData,
};

use super::cart::is_in_cart;
use super::favorites::is_favorite;
use super::users::{get_profile, get_user_by_id};

/// Paginated recipe listing, newest first. Filters compose with AND; the
/// favorited/in-cart filters require a viewer and degrade to no-ops without
/// one.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE",
    );

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tag_slugs.is_empty() {
        query
            .push(" AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug = ANY(")
            .push_bind(&filter.tag_slugs)
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.favorited_only {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorite_entries f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
        if filter.in_cart_only {
            query
                .push(" AND EXISTS (SELECT 1 FROM cart_entries c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.pub_date DESC LIMIT ")
        .push_bind(RECIPE_COUNT_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

pub async fn get_recipe(id: i32, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Fetches a recipe for mutation. Plain users may only touch their own
/// recipes; administrators may touch any.
pub async fn get_recipe_mut(
    id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(ApiError::Unauthorized.default())
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ApiError::NotFound.new("No recipe exists with specified id")),
    }
}

pub async fn list_recipe_tags(recipe_id: i32, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

pub async fn list_recipe_ingredients(
    recipe_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredientRow>, Error> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, l.amount AS amount
        FROM recipe_ingredients l
        INNER JOIN ingredients i ON i.id = l.ingredient_id
        WHERE l.recipe_id = $1
        ORDER BY i.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Full read shape of a recipe: author profile, tags, ingredient lines and
/// the viewer-relative favorite/cart flags.
pub async fn get_recipe_details(
    id: i32,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetails, Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Err(ApiError::NotFound.new("No recipe exists with specified id")),
    };

    let author = match get_user_by_id(pool, recipe.author_id).await? {
        Some(author) => author,
        None => return Err(ApiError::InternalServerError.new("Recipe author is missing")),
    };

    let viewer_id = viewer.map(|v| v.user_id);
    let author = get_profile(&author, viewer_id, pool).await?;
    let tags = list_recipe_tags(id, pool).await?;
    let ingredients = list_recipe_ingredients(id, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer_id {
        Some(user_id) => (
            is_favorite(id, user_id, pool).await?,
            is_in_cart(id, user_id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetails {
        id: recipe.id,
        author,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
        tags,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
    })
}

/// Rejects drafts that name an author other than the caller. The author of a
/// stored recipe is always the authenticated user.
fn check_draft_author(draft: &RecipeDraft, session: &SessionData) -> Result<(), Error> {
    if let Some(author) = draft.author {
        if author != session.public_id {
            return Err(
                ApiError::Unauthorized.new("You cannot create a recipe for another user")
            );
        }
    }
    Ok(())
}

async fn check_references(draft: &RecipeDraft, pool: &Pool<Postgres>) -> Result<(), Error> {
    let tag_ids: Vec<i32> = draft.tags.to_owned();
    let known_tags: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(&tag_ids)
        .fetch_one(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;
    if known_tags.0 != tag_ids.len() as i64 {
        return Err(ApiError::InvalidRequest.new("Unknown tag id"));
    }

    let ingredient_ids: Vec<i32> = draft.ingredients.iter().map(|i| i.id).collect();
    let known_ingredients: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
            .bind(&ingredient_ids)
            .fetch_one(pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;
    if known_ingredients.0 != ingredient_ids.len() as i64 {
        return Err(ApiError::InvalidRequest.new("Unknown ingredient id"));
    }

    Ok(())
}

async fn insert_links(
    recipe_id: i32,
    draft: &RecipeDraft,
    tr: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut tag_query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    tag_query.push_values(draft.tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(tag_id);
    });
    tag_query
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let mut line_query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    line_query.push_values(draft.ingredients.iter(), |mut b, line| {
        b.push_bind(recipe_id)
            .push_bind(line.id)
            .push_bind(line.amount);
    });
    line_query
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// Creates a recipe with its tag links and ingredient lines in one
/// transaction, so a failure leaves no orphaned rows.
pub async fn create_recipe(
    draft: &RecipeDraft,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<i32, Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    check_draft_author(draft, session)?;
    draft.validate().map_err(|e| -> Error { e.into() })?;
    check_references(draft, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    let recipe: (i32,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&draft.name)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    insert_links(recipe.0, draft, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;

    Ok(recipe.0)
}

/// Updates a recipe as an atomic full replace: old tag links and ingredient
/// lines are deleted and the draft's sets inserted, never merged.
pub async fn update_recipe(
    id: i32,
    draft: &RecipeDraft,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    check_draft_author(draft, session)?;
    draft.validate().map_err(|e| -> Error { e.into() })?;
    let recipe = get_recipe_mut(id, session, pool).await?;
    check_references(draft, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    sqlx::query("UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5")
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    insert_links(recipe.id, draft, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;

    Ok(())
}

/// Deletes a recipe and every dependent join row.
pub async fn delete_recipe(
    id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()).into())?;

    for table in [
        "recipe_tags",
        "recipe_ingredients",
        "favorite_entries",
        "cart_entries",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
            .bind(recipe.id)
            .execute(&mut *tr)
            .await
            .map_err(|e| QueryError::from(e).into())?;
    }

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into())?;

    Ok(())
}
