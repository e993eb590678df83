//! Toggle and aggregation properties that need a live Postgres. The suite
//! provisions its own tables and skips entirely when DATABASE_URL is unset.

use std::env;

use sqlx::{Pool, Postgres};

use cookbook_sdk::actions::{
    add_favorite, add_to_cart, create_recipe, list_recipe_ingredients, list_recipe_tags,
    register_user, remove_favorite, shopping_list, subscribe, update_recipe,
};
use cookbook_sdk::forms::{IngredientLineForm, RecipeDraft, RegisterForm};
use cookbook_sdk::jwt::SessionData;
use cookbook_sdk::schema::{User, UserRole};

async fn test_pool() -> Option<Pool<Postgres>> {
    let url = env::var("DATABASE_URL").ok()?;
    let pool = Pool::<Postgres>::connect(&url).await.ok()?;
    setup_schema(&pool).await;
    Some(pool)
}

async fn setup_schema(pool: &Pool<Postgres>) {
    let statements = [
        "DO $$ BEGIN CREATE TYPE user_role AS ENUM ('user', 'admin'); EXCEPTION WHEN duplicate_object THEN NULL; END $$;",
        "CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            public_id UUID NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role user_role NOT NULL DEFAULT 'user',
            registered TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE TABLE IF NOT EXISTS tags (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE
        )",
        "CREATE TABLE IF NOT EXISTS ingredients (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            measurement_unit TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS recipes (
            id SERIAL PRIMARY KEY,
            author_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            image TEXT NOT NULL,
            text TEXT NOT NULL,
            cooking_time INTEGER NOT NULL CHECK (cooking_time >= 1),
            pub_date TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE TABLE IF NOT EXISTS recipe_tags (
            recipe_id INTEGER NOT NULL REFERENCES recipes(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id),
            UNIQUE (recipe_id, tag_id)
        )",
        "CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL REFERENCES recipes(id),
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
            amount INTEGER NOT NULL CHECK (amount >= 1),
            UNIQUE (recipe_id, ingredient_id)
        )",
        "CREATE TABLE IF NOT EXISTS favorite_entries (
            user_id INTEGER NOT NULL REFERENCES users(id),
            recipe_id INTEGER NOT NULL REFERENCES recipes(id),
            created TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (user_id, recipe_id)
        )",
        "CREATE TABLE IF NOT EXISTS cart_entries (
            user_id INTEGER NOT NULL REFERENCES users(id),
            recipe_id INTEGER NOT NULL REFERENCES recipes(id),
            UNIQUE (user_id, recipe_id)
        )",
        "CREATE TABLE IF NOT EXISTS follow_entries (
            follower_id INTEGER NOT NULL REFERENCES users(id),
            author_id INTEGER NOT NULL REFERENCES users(id),
            created TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (follower_id, author_id)
        )",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await.unwrap();
    }
}

fn session_for(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        public_id: user.public_id,
        username: user.username.to_owned(),
        role: user.role.to_owned(),
        is_admin: user.role == UserRole::Admin,
    }
}

async fn new_user(pool: &Pool<Postgres>) -> User {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let form = RegisterForm {
        email: format!("{suffix}@example.com"),
        username: format!("user_{suffix}"),
        first_name: "Test".to_string(),
        last_name: "Cook".to_string(),
        password: "longenough".to_string(),
    };
    register_user(&form, pool).await.unwrap()
}

async fn new_tag(pool: &Pool<Postgres>) -> i32 {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let row: (i32,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, '#ffffff', $2) RETURNING id")
            .bind(format!("tag-{suffix}"))
            .bind(format!("slug-{suffix}"))
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

async fn new_ingredient(pool: &Pool<Postgres>, name: &str, unit: &str) -> i32 {
    let row: (i32,) =
        sqlx::query_as("INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(unit)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

fn draft(tag: i32, ingredients: Vec<IngredientLineForm>) -> RecipeDraft {
    RecipeDraft {
        name: "Test recipe".to_string(),
        image: "recipes/test.png".to_string(),
        text: "Combine and serve.".to_string(),
        cooking_time: 10,
        tags: vec![tag],
        ingredients,
        author: None,
    }
}

#[tokio::test]
async fn favorite_toggle_is_conflict_then_not_found() {
    let Some(pool) = test_pool().await else { return };

    let user = new_user(&pool).await;
    let session = session_for(&user);
    let tag = new_tag(&pool).await;
    let flour = new_ingredient(&pool, "flour", "g").await;
    let recipe = create_recipe(
        &draft(tag, vec![IngredientLineForm { id: flour, amount: 100 }]),
        &session,
        &pool,
    )
    .await
    .unwrap();

    add_favorite(recipe, &session, &pool).await.unwrap();
    let second = add_favorite(recipe, &session, &pool).await.unwrap_err();
    assert_eq!(second.code, 409);

    let stored: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM favorite_entries WHERE user_id = $1 AND recipe_id = $2",
    )
    .bind(user.id)
    .bind(recipe)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stored.0, 1);

    remove_favorite(recipe, &session, &pool).await.unwrap();
    let again = remove_favorite(recipe, &session, &pool).await.unwrap_err();
    assert_eq!(again.code, 404);

    let stored: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM favorite_entries WHERE user_id = $1 AND recipe_id = $2",
    )
    .bind(user.id)
    .bind(recipe)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stored.0, 0);
}

#[tokio::test]
async fn update_replaces_tag_and_ingredient_sets() {
    let Some(pool) = test_pool().await else { return };

    let user = new_user(&pool).await;
    let session = session_for(&user);
    let old_tag = new_tag(&pool).await;
    let new_tag_id = new_tag(&pool).await;
    let flour = new_ingredient(&pool, "zz-old-flour", "g").await;
    let sugar = new_ingredient(&pool, "zz-old-sugar", "g").await;
    let salt = new_ingredient(&pool, "zz-new-salt", "g").await;

    let recipe = create_recipe(
        &draft(
            old_tag,
            vec![
                IngredientLineForm { id: flour, amount: 200 },
                IngredientLineForm { id: sugar, amount: 50 },
            ],
        ),
        &session,
        &pool,
    )
    .await
    .unwrap();

    let mut revised = draft(new_tag_id, vec![IngredientLineForm { id: salt, amount: 5 }]);
    revised.name = "Revised recipe".to_string();
    update_recipe(recipe, &revised, &session, &pool).await.unwrap();

    let lines = list_recipe_ingredients(recipe, &pool).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].ingredient_id, salt);
    assert_eq!(lines[0].amount, 5);

    let tags: Vec<i32> = list_recipe_tags(recipe, &pool)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(tags, vec![new_tag_id]);
}

#[tokio::test]
async fn self_follow_is_always_rejected() {
    let Some(pool) = test_pool().await else { return };

    let user = new_user(&pool).await;
    let session = session_for(&user);

    let err = subscribe(user.public_id, &session, &pool).await.unwrap_err();
    assert_eq!(err.code, 400);
}

#[tokio::test]
async fn shopping_list_sums_shared_ingredients() {
    let Some(pool) = test_pool().await else { return };

    let user = new_user(&pool).await;
    let session = session_for(&user);
    let tag = new_tag(&pool).await;
    let shared = new_ingredient(&pool, "zz-shared", "g").await;
    let salt = new_ingredient(&pool, "zz-salt", "g").await;

    let first = create_recipe(
        &draft(tag, vec![IngredientLineForm { id: shared, amount: 10 }]),
        &session,
        &pool,
    )
    .await
    .unwrap();
    let second = create_recipe(
        &draft(
            tag,
            vec![
                IngredientLineForm { id: shared, amount: 5 },
                IngredientLineForm { id: salt, amount: 2 },
            ],
        ),
        &session,
        &pool,
    )
    .await
    .unwrap();

    add_to_cart(first, &session, &pool).await.unwrap();
    add_to_cart(second, &session, &pool).await.unwrap();

    let items = shopping_list(user.id, &pool).await.unwrap();
    assert_eq!(items.len(), 2);

    let shared_line = items.iter().find(|i| i.name == "zz-shared").unwrap();
    assert_eq!(shared_line.total_amount, 15);
    let salt_line = items.iter().find(|i| i.name == "zz-salt").unwrap();
    assert_eq!(salt_line.total_amount, 2);
}

#[tokio::test]
async fn cart_aggregation_matches_recipe_lines() {
    let Some(pool) = test_pool().await else { return };

    let user = new_user(&pool).await;
    let session = session_for(&user);
    let tag = new_tag(&pool).await;
    let flour = new_ingredient(&pool, "zz-flour", "g").await;
    let sugar = new_ingredient(&pool, "zz-sugar", "g").await;

    let recipe = create_recipe(
        &draft(
            tag,
            vec![
                IngredientLineForm { id: flour, amount: 200 },
                IngredientLineForm { id: sugar, amount: 50 },
            ],
        ),
        &session,
        &pool,
    )
    .await
    .unwrap();
    add_to_cart(recipe, &session, &pool).await.unwrap();

    let items = shopping_list(user.id, &pool).await.unwrap();
    let flour_line = items.iter().find(|i| i.name == "zz-flour").unwrap();
    assert_eq!(flour_line.total_amount, 200);
    assert_eq!(flour_line.measurement_unit, "g");
    let sugar_line = items.iter().find(|i| i.name == "zz-sugar").unwrap();
    assert_eq!(sugar_line.total_amount, 50);
}
