//! Shared fixtures: each test gets a fresh in-memory SQLite database with
//! migrations applied and a temporary media root.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

use recipes::contract::model::{
    Ingredient, IngredientAmount, NewIngredient, NewRecipe, NewTag, RecipeDetails, Tag, User,
};
use recipes::domain::repo::{NewUserRecord, RecipesRepository};
use recipes::domain::service::Service;
use recipes::infra::storage::sea_orm_repo::SeaOrmRecipesRepository;
use recipes::{RecipesConfig, RecipesModule};

/// A 1x1 PNG signature is enough for the decoder.
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

pub struct TestCtx {
    pub db: DatabaseConnection,
    pub module: RecipesModule,
    pub service: Arc<Service>,
    pub media: TempDir,
}

impl TestCtx {
    pub fn repo(&self) -> SeaOrmRecipesRepository<DatabaseConnection> {
        SeaOrmRecipesRepository::new(self.db.clone())
    }

    pub fn router(&self) -> Router {
        self.module.router()
    }
}

/// Create a fresh test database (in-memory SQLite) and run migrations.
pub async fn create_test_db() -> DatabaseConnection {
    // one connection, otherwise every pooled connection sees its own empty DB
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    RecipesModule::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn setup() -> TestCtx {
    setup_with(RecipesConfig::default()).await
}

pub async fn setup_with(cfg: RecipesConfig) -> TestCtx {
    let db = create_test_db().await;
    let media = tempfile::tempdir().expect("tempdir");
    let module = RecipesModule::new(db.clone(), cfg, media.path().to_path_buf());
    TestCtx {
        service: module.service(),
        db,
        module,
        media,
    }
}

/// Insert a user directly, skipping password hashing.
pub async fn user(ctx: &TestCtx, username: &str) -> User {
    ctx.repo()
        .insert_user(NewUserRecord {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: username.to_string(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("insert user")
        .expect("username is free")
}

pub async fn tag(ctx: &TestCtx, slug: &str, color: &str) -> Tag {
    ctx.service
        .create_tag(NewTag {
            name: slug.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        })
        .await
        .expect("create tag")
}

pub async fn ingredient(ctx: &TestCtx, name: &str, unit: &str) -> Ingredient {
    ctx.service
        .create_ingredient(NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        })
        .await
        .expect("create ingredient")
}

pub fn amounts(lines: &[(i32, i32)]) -> Vec<IngredientAmount> {
    lines
        .iter()
        .map(|&(ingredient_id, amount)| IngredientAmount {
            ingredient_id,
            amount,
        })
        .collect()
}

pub fn new_recipe(name: &str, ingredients: &[(i32, i32)], tags: &[i32]) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        text: format!("How to make {name}"),
        cooking_time: 10,
        image: PNG_DATA_URI.to_string(),
        ingredients: amounts(ingredients),
        tags: tags.to_vec(),
    }
}

pub async fn recipe(
    ctx: &TestCtx,
    author: &User,
    name: &str,
    ingredients: &[(i32, i32)],
    tags: &[i32],
) -> RecipeDetails {
    ctx.service
        .create_recipe(author.id, new_recipe(name, ingredients, tags))
        .await
        .expect("create recipe")
}

/// Catalogue used by most tests: two ingredients and two tags.
pub struct Catalogue {
    pub flour: Ingredient,
    pub milk: Ingredient,
    pub breakfast: Tag,
    pub dinner: Tag,
}

pub async fn catalogue(ctx: &TestCtx) -> Catalogue {
    Catalogue {
        flour: ingredient(ctx, "flour", "g").await,
        milk: ingredient(ctx, "milk", "ml").await,
        breakfast: tag(ctx, "breakfast", "#E26C2D").await,
        dinner: tag(ctx, "dinner", "#49B64E").await,
    }
}
