use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::model::{
    Composition, Ingredient, IngredientId, NewIngredient, NewTag, Recipe, RecipeId,
    RecipeIngredient, RecipeList, ShoppingListItem, Tag, TagId, User, UserId,
};

/// User row plus its password hash, for credential checks only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewRecipeRecord {
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Resolved recipe list query. The list restrictions carry the viewer id.
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub author_id: Option<UserId>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
}

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait RecipesRepository: Send + Sync {
    // ---- users ----
    /// `None` when the email or username is already taken.
    async fn insert_user(&self, u: NewUserRecord) -> anyhow::Result<Option<User>>;
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<User>>;
    async fn find_credentials_by_email(&self, email: &str)
        -> anyhow::Result<Option<UserCredentials>>;
    async fn find_credentials(&self, id: UserId) -> anyhow::Result<Option<UserCredentials>>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    async fn username_exists(&self, username: &str) -> anyhow::Result<bool>;
    async fn update_password(&self, id: UserId, password_hash: String) -> anyhow::Result<()>;
    /// Users ordered by username, plus the total count.
    async fn list_users(&self, offset: u64, limit: u64) -> anyhow::Result<(Vec<User>, u64)>;
    async fn users_by_ids(&self, ids: &[UserId]) -> anyhow::Result<Vec<User>>;

    // ---- auth tokens ----
    async fn token_for_user(&self, user_id: UserId) -> anyhow::Result<Option<String>>;
    /// Store a token for the user and return the one now stored; a token
    /// issued concurrently for the same user wins.
    async fn insert_token(&self, key: &str, user_id: UserId) -> anyhow::Result<String>;
    async fn user_by_token(&self, key: &str) -> anyhow::Result<Option<User>>;
    async fn delete_tokens(&self, user_id: UserId) -> anyhow::Result<()>;

    // ---- subscriptions ----
    /// Returns false if the subscription already existed.
    async fn insert_subscription(&self, user_id: UserId, author_id: UserId)
        -> anyhow::Result<bool>;
    /// Returns true if a row was deleted.
    async fn delete_subscription(&self, user_id: UserId, author_id: UserId)
        -> anyhow::Result<bool>;
    /// Followed authors ordered by username, plus the total count.
    async fn subscribed_authors(
        &self,
        user_id: UserId,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<User>, u64)>;
    /// Which of `author_ids` the user follows.
    async fn subscribed_among(
        &self,
        user_id: UserId,
        author_ids: &[UserId],
    ) -> anyhow::Result<HashSet<UserId>>;

    // ---- tags ----
    async fn insert_tag(&self, t: NewTag) -> anyhow::Result<Tag>;
    async fn find_tag(&self, id: TagId) -> anyhow::Result<Option<Tag>>;
    async fn list_tags(&self) -> anyhow::Result<Vec<Tag>>;
    /// True if another tag already uses this name, color or slug.
    async fn tag_conflicts(&self, t: &NewTag) -> anyhow::Result<bool>;
    async fn existing_tag_ids(&self, ids: &[TagId]) -> anyhow::Result<HashSet<TagId>>;

    // ---- ingredients ----
    async fn insert_ingredient(&self, i: NewIngredient) -> anyhow::Result<Ingredient>;
    async fn find_ingredient(&self, id: IngredientId) -> anyhow::Result<Option<Ingredient>>;
    /// Ingredients ordered by name, optionally restricted to a name prefix.
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> anyhow::Result<Vec<Ingredient>>;
    async fn ingredient_exists(&self, i: &NewIngredient) -> anyhow::Result<bool>;
    async fn existing_ingredient_ids(
        &self,
        ids: &[IngredientId],
    ) -> anyhow::Result<HashSet<IngredientId>>;

    // ---- recipes ----
    // Composition writes run in one transaction. When a referenced row is
    // missing they roll back and report `None`/`false` instead of an error.

    /// Insert a recipe and its composition.
    async fn insert_recipe(
        &self,
        r: NewRecipeRecord,
        c: &Composition,
    ) -> anyhow::Result<Option<Recipe>>;
    /// Update recipe fields and replace its composition.
    async fn update_recipe(&self, r: Recipe, c: &Composition) -> anyhow::Result<bool>;
    /// Replace the recipe's ingredient and tag sets.
    async fn replace_composition(&self, recipe_id: RecipeId, c: &Composition)
        -> anyhow::Result<bool>;
    /// Delete by id. Returns true if a row was deleted.
    async fn delete_recipe(&self, id: RecipeId) -> anyhow::Result<bool>;
    async fn find_recipe(&self, id: RecipeId) -> anyhow::Result<Option<Recipe>>;
    /// Recipes newest first, plus the total count.
    async fn list_recipes(
        &self,
        q: &RecipeQuery,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Recipe>, u64)>;
    /// An author's recipes newest first, at most `limit` when given.
    async fn recipes_by_author(
        &self,
        author_id: UserId,
        limit: Option<u64>,
    ) -> anyhow::Result<Vec<Recipe>>;
    async fn count_recipes_by_authors(
        &self,
        author_ids: &[UserId],
    ) -> anyhow::Result<HashMap<UserId, u64>>;
    /// Tags of each recipe, ordered by tag name.
    async fn tags_for_recipes(&self, ids: &[RecipeId]) -> anyhow::Result<Vec<(RecipeId, Tag)>>;
    /// Ingredient lines of each recipe, in insertion order.
    async fn ingredients_for_recipes(
        &self,
        ids: &[RecipeId],
    ) -> anyhow::Result<Vec<(RecipeId, RecipeIngredient)>>;

    // ---- favorites / shopping cart ----
    /// Returns false if the recipe was already in the list.
    async fn insert_list_entry(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> anyhow::Result<bool>;
    /// Returns true if a row was deleted.
    async fn delete_list_entry(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> anyhow::Result<bool>;
    /// Which of `recipe_ids` are in the user's list.
    async fn list_entries_among(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_ids: &[RecipeId],
    ) -> anyhow::Result<HashSet<RecipeId>>;

    /// Ingredient totals over every recipe in the user's cart, grouped by
    /// (name, measurement unit).
    async fn shopping_list(&self, user_id: UserId) -> anyhow::Result<Vec<ShoppingListItem>>;
}
