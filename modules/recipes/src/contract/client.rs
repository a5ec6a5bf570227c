use async_trait::async_trait;

use crate::contract::{
    error::RecipesError,
    model::{
        Ingredient, NewIngredient, NewTag, RecipeDetails, RecipeId, ShoppingListItem, Tag, UserId,
    },
};

/// Public API trait for the recipes module that other modules and tools can use
#[async_trait]
pub trait RecipesApi: Send + Sync {
    /// All tags ordered by name
    async fn list_tags(&self) -> Result<Vec<Tag>, RecipesError>;

    /// Ingredients ordered by name, optionally restricted to a name prefix
    async fn list_ingredients(&self, name_prefix: Option<String>)
        -> Result<Vec<Ingredient>, RecipesError>;

    /// Get-or-create each tag; returns how many were created
    async fn load_tags(&self, tags: Vec<NewTag>) -> Result<usize, RecipesError>;

    /// Get-or-create each ingredient; returns how many were created
    async fn load_ingredients(&self, items: Vec<NewIngredient>) -> Result<usize, RecipesError>;

    /// A recipe as seen by an anonymous viewer
    async fn get_recipe(&self, id: RecipeId) -> Result<RecipeDetails, RecipesError>;

    /// Aggregated shopping list of a user
    async fn shopping_list(&self, user_id: UserId) -> Result<Vec<ShoppingListItem>, RecipesError>;
}
