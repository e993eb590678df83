use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TypeError;

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => return Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub public_id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub registered: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User list row. `count` is the windowed total used for pagination.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: Id,
    pub public_id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub count: i64,
}

/// Viewer-relative projection of a user, as returned by the user endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub public_id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            public_id: user.public_id,
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,

    pub count: i64,
}

/// Short recipe shape returned by the favorite/cart toggle actions.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeShortInfo {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeShortInfo {
    fn from(value: &Recipe) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
            image: value.image.to_owned(),
            cooking_time: value.cooking_time,
        }
    }
}

/// One ingredient line of a recipe, joined to the ingredient reference data.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeIngredientRow {
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetails {
    pub id: Id,
    pub author: UserProfile,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredientRow>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Aggregated shopping-list line: amounts summed over every cart recipe,
/// keyed by ingredient identity so a name reused with a different unit stays
/// a separate line.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub total_amount: i64,
    pub measurement_unit: String,
}

/// A followed author together with their recipes, as listed by the
/// subscriptions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FollowedAuthor {
    pub author: UserProfile,
    pub recipes: Vec<RecipeShortInfo>,
    pub recipes_count: i64,
}

/// Optional recipe list filters. Every `None`/empty/`false` member is a no-op.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tag_slugs: Vec<String>,
    pub favorited_only: bool,
    pub in_cart_only: bool,
}
