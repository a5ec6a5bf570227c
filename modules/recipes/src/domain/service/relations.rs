use tracing::{debug, info, instrument};

use super::Service;
use crate::contract::model::{
    AuthorSubscription, Page, PageRequest, Recipe, RecipeId, RecipeList, User, UserId, UserView,
};
use crate::domain::error::DomainError;

impl Service {
    /// Follow an author. Returns the subscription view with a recipe preview.
    #[instrument(name = "recipes.service.subscribe", skip(self))]
    pub async fn subscribe(
        &self,
        user_id: UserId,
        author_id: UserId,
        recipes_limit: Option<u64>,
    ) -> Result<AuthorSubscription, DomainError> {
        if user_id == author_id {
            return Err(DomainError::invalid_subscription(
                "cannot subscribe to yourself",
            ));
        }
        let author = self
            .repo
            .find_user(author_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(author_id))?;

        if !self.repo.insert_subscription(user_id, author_id).await? {
            return Err(DomainError::already_exists(format!(
                "Subscription to user {author_id}"
            )));
        }
        info!("Subscribed");

        let mut subs = self
            .author_subscriptions(vec![author], recipes_limit)
            .await?;
        subs.pop()
            .ok_or_else(|| DomainError::user_not_found(author_id))
    }

    /// Stop following an author. Not following is not an error.
    #[instrument(name = "recipes.service.unsubscribe", skip(self))]
    pub async fn unsubscribe(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<(), DomainError> {
        if self.repo.find_user(author_id).await?.is_none() {
            return Err(DomainError::user_not_found(author_id));
        }
        let removed = self.repo.delete_subscription(user_id, author_id).await?;
        info!(removed, "Unsubscribed");
        Ok(())
    }

    #[instrument(name = "recipes.service.list_subscriptions", skip(self))]
    pub async fn list_subscriptions(
        &self,
        user_id: UserId,
        req: PageRequest,
        recipes_limit: Option<u64>,
    ) -> Result<Page<AuthorSubscription>, DomainError> {
        let window = self.config.page_window(req)?;
        let (authors, total) = self
            .repo
            .subscribed_authors(user_id, window.offset, window.limit)
            .await?;
        let subs = self.author_subscriptions(authors, recipes_limit).await?;
        debug!("Listed {} of {} subscriptions", subs.len(), total);
        window.into_page(subs, total)
    }

    /// Build subscription views for authors the caller follows.
    async fn author_subscriptions(
        &self,
        authors: Vec<User>,
        recipes_limit: Option<u64>,
    ) -> Result<Vec<AuthorSubscription>, DomainError> {
        let recipes_limit = self.config.preview_limit(recipes_limit);
        let ids: Vec<UserId> = authors.iter().map(|a| a.id).collect();
        let counts = self.repo.count_recipes_by_authors(&ids).await?;

        let mut out = Vec::with_capacity(authors.len());
        for author in authors {
            let recipes = self.repo.recipes_by_author(author.id, recipes_limit).await?;
            out.push(AuthorSubscription {
                recipes_count: counts.get(&author.id).copied().unwrap_or(0),
                recipes,
                author: UserView {
                    user: author,
                    is_subscribed: true,
                },
            });
        }
        Ok(out)
    }

    #[instrument(name = "recipes.service.add_favorite", skip(self))]
    pub async fn add_favorite(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<Recipe, DomainError> {
        self.add_to_list(RecipeList::Favorites, user_id, recipe_id).await
    }

    #[instrument(name = "recipes.service.remove_favorite", skip(self))]
    pub async fn remove_favorite(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<(), DomainError> {
        self.remove_from_list(RecipeList::Favorites, user_id, recipe_id)
            .await
    }

    #[instrument(name = "recipes.service.add_to_cart", skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<Recipe, DomainError> {
        self.add_to_list(RecipeList::ShoppingCart, user_id, recipe_id)
            .await
    }

    #[instrument(name = "recipes.service.remove_from_cart", skip(self))]
    pub async fn remove_from_cart(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<(), DomainError> {
        self.remove_from_list(RecipeList::ShoppingCart, user_id, recipe_id)
            .await
    }

    async fn add_to_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<Recipe, DomainError> {
        let recipe = self
            .repo
            .find_recipe(recipe_id)
            .await?
            .ok_or_else(|| DomainError::recipe_not_found(recipe_id))?;
        if !self.repo.insert_list_entry(list, user_id, recipe_id).await? {
            return Err(DomainError::already_exists(format!(
                "Recipe {recipe_id} in {}",
                list.as_str()
            )));
        }
        info!(list = list.as_str(), "Recipe added");
        Ok(recipe)
    }

    async fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<(), DomainError> {
        if self.repo.find_recipe(recipe_id).await?.is_none() {
            return Err(DomainError::recipe_not_found(recipe_id));
        }
        let removed = self
            .repo
            .delete_list_entry(list, user_id, recipe_id)
            .await?;
        info!(list = list.as_str(), removed, "Recipe removed");
        Ok(())
    }
}
