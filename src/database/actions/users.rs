use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    constants::USER_COUNT_PER_PAGE,
    database::error::QueryError,
    database::forms::{RegisterForm, SetPasswordForm},
    database::pagination::PageContext,
    database::schema::{User, UserProfile, UserRow},
    error::{ApiError, Error},
};

use super::follows::is_subscribed;

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: i32) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_by_public_id(
    pool: &Pool<Postgres>,
    public_id: uuid::Uuid,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE public_id = $1")
        .bind(public_id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Paginated user listing. `search` matches usernames exactly when supplied.
pub async fn fetch_users(
    search: Option<&str>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, Error> {
    let rows: Vec<UserRow> = match search {
        Some(username) => {
            sqlx::query_as("SELECT u.id, u.public_id, u.username, u.email, u.first_name, u.last_name, COUNT(*) OVER() AS count FROM users u WHERE u.username = $1 ORDER BY u.id LIMIT $2 OFFSET $3")
                .bind(username)
                .bind(USER_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await.map_err(|e| QueryError::from(e).into())?
        }
        None => {
            sqlx::query_as("SELECT u.id, u.public_id, u.username, u.email, u.first_name, u.last_name, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2")
                .bind(USER_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await.map_err(|e| QueryError::from(e).into())?
        }
    };

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, USER_COUNT_PER_PAGE, offset);
    Ok(page)
}

/// Validates and creates a user. Username and email uniqueness is enforced by
/// the database so concurrent registrations resolve to one row.
pub async fn register_user(form: &RegisterForm, pool: &Pool<Postgres>) -> Result<User, Error> {
    form.validate().map_err(|e| -> Error { e.into() })?;

    let password_hash = hash_password(&form.password)
        .map_err(|_| ApiError::InternalServerError.new("Failed to hash password"))?;

    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (public_id, username, email, password, first_name, last_name, role)
        VALUES ($1, $2, $3, $4, $5, $6, 'user')
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(&form.username)
    .bind(&form.email)
    .bind(password_hash)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    match row {
        Some(user) => Ok(user),
        None => Err(ApiError::Conflict.new("Username or email is already taken")),
    }
}

/// Verifies credentials and returns a signed session token.
pub async fn login_user(
    username: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user(pool, username).await? {
        Some(user) => user,
        None => return Err(ApiError::InvalidRequest.new("Invalid credentials")),
    };

    let authenticated = verify_password(password, &user.password)
        .map_err(|_| ApiError::InternalServerError.new("Failed to verify password"))?;
    if !authenticated {
        return Err(ApiError::InvalidRequest.new("Invalid credentials"));
    }

    generate_jwt_session(&user)
}

pub async fn set_password(
    user_id: i32,
    form: &SetPasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = match get_user_by_id(pool, user_id).await? {
        Some(user) => user,
        None => return Err(ApiError::NotFound.new("No user exists with specified id")),
    };

    let authenticated = verify_password(&form.current_password, &user.password)
        .map_err(|_| ApiError::InternalServerError.new("Failed to verify password"))?;
    if !authenticated {
        return Err(ApiError::InvalidRequest.new("Current password does not match"));
    }

    form.validate().map_err(|e| -> Error { e.into() })?;

    let password_hash = hash_password(&form.new_password)
        .map_err(|_| ApiError::InternalServerError.new("Failed to hash password"))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(user_id)
        .execute(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// Viewer-relative profile: `is_subscribed` reflects whether the viewer
/// follows this user, and is always false for anonymous viewers.
pub async fn get_profile(
    user: &User,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, Error> {
    let is_subscribed = match viewer {
        Some(viewer_id) => is_subscribed(viewer_id, user.id, pool).await?,
        None => false,
    };

    Ok(UserProfile::from_user(user, is_subscribed))
}
