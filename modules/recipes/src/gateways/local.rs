use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::RecipesApi,
    error::RecipesError,
    model::{
        Ingredient, NewIngredient, NewTag, RecipeDetails, RecipeId, ShoppingListItem, Tag, UserId,
    },
};
use crate::domain::service::Service;

/// Local implementation of the RecipesApi trait that delegates to the domain service
pub struct RecipesLocalClient {
    service: Arc<Service>,
}

impl RecipesLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RecipesApi for RecipesLocalClient {
    async fn list_tags(&self) -> Result<Vec<Tag>, RecipesError> {
        self.service.list_tags().await.map_err(Into::into)
    }

    async fn list_ingredients(
        &self,
        name_prefix: Option<String>,
    ) -> Result<Vec<Ingredient>, RecipesError> {
        self.service
            .list_ingredients(name_prefix.as_deref())
            .await
            .map_err(Into::into)
    }

    async fn load_tags(&self, tags: Vec<NewTag>) -> Result<usize, RecipesError> {
        self.service.load_tags(tags).await.map_err(Into::into)
    }

    async fn load_ingredients(&self, items: Vec<NewIngredient>) -> Result<usize, RecipesError> {
        self.service.load_ingredients(items).await.map_err(Into::into)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<RecipeDetails, RecipesError> {
        self.service.get_recipe(None, id).await.map_err(Into::into)
    }

    async fn shopping_list(&self, user_id: UserId) -> Result<Vec<ShoppingListItem>, RecipesError> {
        self.service.shopping_list(user_id).await.map_err(Into::into)
    }
}
