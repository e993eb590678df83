use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    database::error::QueryError,
    database::pagination::PageContext,
    database::schema::{FollowedAuthor, RecipeShortInfo, UserProfile, UserRow},
    error::{ApiError, Error},
    jwt::SessionData,
};

use super::users::get_user_by_public_id;

pub async fn is_subscribed(
    follower_id: i32,
    author_id: i32,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result: Option<(i32,)> = sqlx::query_as(
        "
        SELECT author_id FROM follow_entries WHERE follower_id = $1 AND author_id = $2
    ",
    )
    .bind(follower_id)
    .bind(author_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(result.is_some())
}

/// Follows an author. Self-follow is rejected before anything else, whether
/// or not a follow entry exists.
pub async fn subscribe(
    author_public_id: uuid::Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if author_public_id == session.public_id {
        return Err(ApiError::InvalidRequest.new("You cannot subscribe to yourself"));
    }

    let author = match get_user_by_public_id(pool, author_public_id).await? {
        Some(author) => author,
        None => return Err(ApiError::NotFound.new("No user exists with specified id")),
    };

    let result = sqlx::query(
        "INSERT INTO follow_entries (follower_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *;",
    )
    .bind(session.user_id)
    .bind(author.id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::Conflict.new("You are already subscribed to this author"));
    }

    Ok(UserProfile::from_user(&author, true))
}

pub async fn unsubscribe(
    author_public_id: uuid::Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if author_public_id == session.public_id {
        return Err(ApiError::InvalidRequest.new("You cannot subscribe to yourself"));
    }

    let author = match get_user_by_public_id(pool, author_public_id).await? {
        Some(author) => author,
        None => return Err(ApiError::NotFound.new("No user exists with specified id")),
    };

    let result = sqlx::query("DELETE FROM follow_entries WHERE follower_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author.id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound.new("You are not subscribed to this author"));
    }

    Ok(())
}

/// Authors the user follows, newest follow first, each with their recipes
/// (optionally capped by `recipes_limit`) and a total recipe count.
pub async fn fetch_subscriptions(
    user_id: i32,
    offset: i64,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<FollowedAuthor>, Error> {
    let authors: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.public_id, u.username, u.email, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM follow_entries f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.follower_id = $1
        ORDER BY f.created DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let total_count = authors.get(0).map(|a| a.count).unwrap_or(0);

    let mut rows: Vec<FollowedAuthor> = Vec::with_capacity(authors.len());
    for author in authors {
        let recipes: Vec<RecipeShortInfo> = sqlx::query_as(
            "
            SELECT id, name, image, cooking_time
            FROM recipes
            WHERE author_id = $1
            ORDER BY pub_date DESC
            LIMIT $2
        ",
        )
        .bind(author.id)
        .bind(recipes_limit.unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

        let recipes_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
                .bind(author.id)
                .fetch_one(pool)
                .await
                .map_err(|e| QueryError::from(e).into())?;

        rows.push(FollowedAuthor {
            author: UserProfile {
                public_id: author.public_id,
                username: author.username,
                email: author.email,
                first_name: author.first_name,
                last_name: author.last_name,
                is_subscribed: true,
            },
            recipes,
            recipes_count: recipes_count.0,
        });
    }

    let page = PageContext::from_rows(rows, total_count, SUBSCRIPTION_COUNT_PER_PAGE, offset);
    Ok(page)
}
