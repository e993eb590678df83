use sqlx::{Pool, Postgres};

use crate::{database::error::QueryError, database::schema::Ingredient, error::Error};

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY id")
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// LIKE pattern characters in the search term must match literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Name-prefix search, case insensitive. An empty prefix lists everything.
pub async fn fetch_ingredients(
    name_prefix: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 || '%' ORDER BY name")
            .bind(escape_like(name_prefix))
            .fetch_all(&*pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

pub async fn get_ingredient(id: i32, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_are_matched_literally() {
        assert_eq!(escape_like("100% rye"), "100\\% rye");
        assert_eq!(escape_like("sea_salt"), "sea\\_salt");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
