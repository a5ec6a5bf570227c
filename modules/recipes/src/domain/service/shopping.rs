use tracing::{debug, instrument};

use super::Service;
use crate::contract::model::{ShoppingListItem, UserId};
use crate::domain::error::DomainError;
use crate::domain::shopping_list;

impl Service {
    /// Ingredient totals over the user's cart, ordered by name then unit.
    /// An empty cart yields an empty list.
    #[instrument(name = "recipes.service.shopping_list", skip(self))]
    pub async fn shopping_list(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ShoppingListItem>, DomainError> {
        let mut items = self.repo.shopping_list(user_id).await?;
        shopping_list::sort_items(&mut items);
        debug!("Aggregated {} shopping list lines", items.len());
        Ok(items)
    }

    /// The shopping list rendered as the downloadable text file.
    pub async fn shopping_list_text(&self, user_id: UserId) -> Result<String, DomainError> {
        let items = self.shopping_list(user_id).await?;
        Ok(shopping_list::render(&self.config.shopping_list_title, &items))
    }
}
