use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::Service;
use crate::contract::model::{
    Composition, IngredientAmount, NewRecipe, Page, PageRequest, Recipe, RecipeDetails,
    RecipeFilter, RecipeId, RecipeIngredient, RecipeList, RecipeUpdate, Tag, TagId, UserId,
};
use crate::domain::error::DomainError;
use crate::domain::image::decode_image;
use crate::domain::repo::{NewRecipeRecord, RecipeQuery};

impl Service {
    /// Replace the ingredient and tag sets of a recipe as one unit.
    ///
    /// Empty sets are accepted here; the create/update paths require at least
    /// one ingredient and one tag before calling it.
    #[instrument(
        name = "recipes.service.replace_composition",
        skip(self, composition),
        fields(recipe_id = %recipe_id)
    )]
    pub async fn replace_composition(
        &self,
        recipe_id: RecipeId,
        composition: Composition,
    ) -> Result<(), DomainError> {
        if self.repo.find_recipe(recipe_id).await?.is_none() {
            return Err(DomainError::recipe_not_found(recipe_id));
        }
        let composition = self.check_composition(composition).await?;
        if !self
            .repo
            .replace_composition(recipe_id, &composition)
            .await?
        {
            return Err(self
                .stale_reference(&composition, DomainError::recipe_not_found(recipe_id))
                .await);
        }
        info!(
            ingredients = composition.ingredients.len(),
            tags = composition.tag_ids.len(),
            "Composition replaced"
        );
        Ok(())
    }

    #[instrument(
        name = "recipes.service.create_recipe",
        skip(self, new_recipe),
        fields(author_id = %author_id, name = %new_recipe.name)
    )]
    pub async fn create_recipe(
        &self,
        author_id: UserId,
        new_recipe: NewRecipe,
    ) -> Result<RecipeDetails, DomainError> {
        info!("Creating recipe");

        self.validate_fields(&new_recipe.name, &new_recipe.text, new_recipe.cooking_time)?;
        let composition = Composition {
            ingredients: new_recipe.ingredients,
            tag_ids: new_recipe.tags,
        };
        require_non_empty(&composition)?;
        let composition = self.check_composition(composition).await?;
        let image = decode_image(&new_recipe.image)?;

        let image_path = self.images.save(image).await?;
        let record = NewRecipeRecord {
            author_id,
            name: new_recipe.name,
            image: image_path.clone(),
            text: new_recipe.text,
            cooking_time: new_recipe.cooking_time,
            created_at: Utc::now(),
        };
        let recipe = match self.repo.insert_recipe(record, &composition).await {
            Ok(Some(recipe)) => recipe,
            Ok(None) => {
                self.discard_image(&image_path).await;
                return Err(self
                    .stale_reference(&composition, DomainError::user_not_found(author_id))
                    .await);
            }
            Err(e) => {
                self.discard_image(&image_path).await;
                return Err(e.into());
            }
        };

        info!("Successfully created recipe with id={}", recipe.id);
        self.details_one(Some(author_id), recipe).await
    }

    #[instrument(
        name = "recipes.service.update_recipe",
        skip(self, update),
        fields(recipe_id = %id)
    )]
    pub async fn update_recipe(
        &self,
        user_id: UserId,
        id: RecipeId,
        update: RecipeUpdate,
    ) -> Result<RecipeDetails, DomainError> {
        info!("Updating recipe");

        let current = self.owned_recipe(user_id, id).await?;

        self.validate_fields(&update.name, &update.text, update.cooking_time)?;
        let composition = Composition {
            ingredients: update.ingredients,
            tag_ids: update.tags,
        };
        require_non_empty(&composition)?;
        let composition = self.check_composition(composition).await?;
        let new_image = update.image.as_deref().map(decode_image).transpose()?;

        let new_image_path = match new_image {
            Some(image) => Some(self.images.save(image).await?),
            None => None,
        };
        let updated = Recipe {
            name: update.name,
            text: update.text,
            cooking_time: update.cooking_time,
            image: new_image_path
                .clone()
                .unwrap_or_else(|| current.image.clone()),
            ..current.clone()
        };
        let written = match self.repo.update_recipe(updated.clone(), &composition).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(self
                .stale_reference(&composition, DomainError::recipe_not_found(id))
                .await),
            Err(e) => Err(DomainError::from(e)),
        };
        if let Err(e) = written {
            if let Some(path) = &new_image_path {
                self.discard_image(path).await;
            }
            return Err(e);
        }
        if new_image_path.is_some() {
            self.discard_image(&current.image).await;
        }

        info!("Successfully updated recipe");
        self.details_one(Some(user_id), updated).await
    }

    #[instrument(name = "recipes.service.delete_recipe", skip(self), fields(recipe_id = %id))]
    pub async fn delete_recipe(&self, user_id: UserId, id: RecipeId) -> Result<(), DomainError> {
        info!("Deleting recipe");

        let recipe = self.owned_recipe(user_id, id).await?;
        if !self.repo.delete_recipe(id).await? {
            return Err(DomainError::recipe_not_found(id));
        }
        self.discard_image(&recipe.image).await;

        info!("Successfully deleted recipe");
        Ok(())
    }

    #[instrument(name = "recipes.service.get_recipe", skip(self), fields(recipe_id = %id))]
    pub async fn get_recipe(
        &self,
        viewer: Option<UserId>,
        id: RecipeId,
    ) -> Result<RecipeDetails, DomainError> {
        debug!("Getting recipe by id");
        let recipe = self
            .repo
            .find_recipe(id)
            .await?
            .ok_or_else(|| DomainError::recipe_not_found(id))?;
        self.details_one(viewer, recipe).await
    }

    /// List recipes newest first. The favorites and cart filters only apply
    /// when a viewer is given.
    #[instrument(name = "recipes.service.list_recipes", skip(self))]
    pub async fn list_recipes(
        &self,
        viewer: Option<UserId>,
        filter: RecipeFilter,
        req: PageRequest,
    ) -> Result<Page<RecipeDetails>, DomainError> {
        let window = self.config.page_window(req)?;
        let query = RecipeQuery {
            author_id: filter.author,
            tag_slugs: filter.tags,
            favorited_by: viewer.filter(|_| filter.is_favorited),
            in_cart_of: viewer.filter(|_| filter.is_in_shopping_cart),
        };
        let (recipes, total) = self
            .repo
            .list_recipes(&query, window.offset, window.limit)
            .await?;
        let details = self.details(viewer, recipes).await?;
        debug!("Listed {} of {} recipes", details.len(), total);
        window.into_page(details, total)
    }

    async fn owned_recipe(&self, user_id: UserId, id: RecipeId) -> Result<Recipe, DomainError> {
        let recipe = self
            .repo
            .find_recipe(id)
            .await?
            .ok_or_else(|| DomainError::recipe_not_found(id))?;
        if recipe.author_id != user_id {
            return Err(DomainError::forbidden(
                "only the author can modify this recipe",
            ));
        }
        Ok(recipe)
    }

    fn validate_fields(
        &self,
        name: &str,
        text: &str,
        cooking_time: i32,
    ) -> Result<(), DomainError> {
        let max = self.config.max_recipe_name_length;
        if name.trim().is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if name.chars().count() > max {
            return Err(DomainError::validation(
                "name",
                format!("at most {max} characters"),
            ));
        }
        if text.trim().is_empty() {
            return Err(DomainError::validation("text", "must not be empty"));
        }
        if cooking_time < 1 {
            return Err(DomainError::validation(
                "cooking_time",
                "must be at least 1 minute",
            ));
        }
        Ok(())
    }

    /// Validate a composition against the catalogue and normalise it: amounts
    /// must be positive, ingredients unique, every id known; duplicate tags
    /// collapse to one.
    async fn check_composition(&self, c: Composition) -> Result<Composition, DomainError> {
        let ingredients = check_ingredient_lines(c.ingredients)?;
        let tag_ids = dedup_tags(c.tag_ids);

        let ingredient_ids: Vec<i32> = ingredients.iter().map(|i| i.ingredient_id).collect();
        let known = self.repo.existing_ingredient_ids(&ingredient_ids).await?;
        let missing = missing_ids(&ingredient_ids, &known);
        if !missing.is_empty() {
            return Err(DomainError::reference_not_found("ingredient", missing));
        }

        let known = self.repo.existing_tag_ids(&tag_ids).await?;
        let missing = missing_ids(&tag_ids, &known);
        if !missing.is_empty() {
            return Err(DomainError::reference_not_found("tag", missing));
        }

        Ok(Composition {
            ingredients,
            tag_ids,
        })
    }

    /// Explain a composition write that hit a row removed after
    /// `check_composition` ran. `fallback` covers the recipe or author itself.
    async fn stale_reference(&self, c: &Composition, fallback: DomainError) -> DomainError {
        warn!("Composition write referenced a row that no longer exists");
        match self.check_composition(c.clone()).await {
            Err(e) => e,
            Ok(_) => fallback,
        }
    }

    /// Best-effort removal of a stored image.
    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.images.remove(path).await {
            warn!(path, error = %e, "Failed to remove image");
        }
    }

    async fn details_one(
        &self,
        viewer: Option<UserId>,
        recipe: Recipe,
    ) -> Result<RecipeDetails, DomainError> {
        let id = recipe.id;
        self.details(viewer, vec![recipe])
            .await?
            .pop()
            .ok_or_else(|| DomainError::recipe_not_found(id))
    }

    /// Hydrate recipes with authors, tags, ingredients and the viewer's flags,
    /// using one batch query per relation.
    pub(crate) async fn details(
        &self,
        viewer: Option<UserId>,
        recipes: Vec<Recipe>,
    ) -> Result<Vec<RecipeDetails>, DomainError> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<RecipeId> = recipes.iter().map(|r| r.id).collect();

        let mut tags: HashMap<RecipeId, Vec<Tag>> = HashMap::new();
        for (recipe_id, tag) in self.repo.tags_for_recipes(&ids).await? {
            tags.entry(recipe_id).or_default().push(tag);
        }
        let mut ingredients: HashMap<RecipeId, Vec<RecipeIngredient>> = HashMap::new();
        for (recipe_id, line) in self.repo.ingredients_for_recipes(&ids).await? {
            ingredients.entry(recipe_id).or_default().push(line);
        }

        let author_ids: Vec<UserId> = recipes
            .iter()
            .map(|r| r.author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let authors = self.repo.users_by_ids(&author_ids).await?;
        let authors: HashMap<UserId, _> = self
            .user_views(viewer, authors)
            .await?
            .into_iter()
            .map(|v| (v.user.id, v))
            .collect();

        let (favorites, cart) = match viewer {
            Some(user_id) => (
                self.repo
                    .list_entries_among(RecipeList::Favorites, user_id, &ids)
                    .await?,
                self.repo
                    .list_entries_among(RecipeList::ShoppingCart, user_id, &ids)
                    .await?,
            ),
            None => (HashSet::new(), HashSet::new()),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors
                    .get(&recipe.author_id)
                    .cloned()
                    .ok_or_else(|| DomainError::user_not_found(recipe.author_id))?;
                Ok(RecipeDetails {
                    author,
                    tags: tags.remove(&recipe.id).unwrap_or_default(),
                    ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorites.contains(&recipe.id),
                    is_in_shopping_cart: cart.contains(&recipe.id),
                    recipe,
                })
            })
            .collect()
    }
}

fn require_non_empty(c: &Composition) -> Result<(), DomainError> {
    if c.ingredients.is_empty() {
        return Err(DomainError::validation(
            "ingredients",
            "at least one ingredient is required",
        ));
    }
    if c.tag_ids.is_empty() {
        return Err(DomainError::validation("tags", "at least one tag is required"));
    }
    Ok(())
}

fn check_ingredient_lines(
    lines: Vec<IngredientAmount>,
) -> Result<Vec<IngredientAmount>, DomainError> {
    let mut seen = HashSet::with_capacity(lines.len());
    for line in &lines {
        if line.amount < 1 {
            return Err(DomainError::validation(
                "amount",
                format!(
                    "amount for ingredient {} must be at least 1",
                    line.ingredient_id
                ),
            ));
        }
        if !seen.insert(line.ingredient_id) {
            return Err(DomainError::DuplicateIngredient {
                id: line.ingredient_id,
            });
        }
    }
    Ok(lines)
}

/// Drop repeated tag ids, keeping first occurrences in order.
fn dedup_tags(ids: Vec<TagId>) -> Vec<TagId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn missing_ids(requested: &[i32], known: &HashSet<i32>) -> Vec<i32> {
    let missing: BTreeSet<i32> = requested
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect();
    missing.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ingredient_id: i32, amount: i32) -> IngredientAmount {
        IngredientAmount {
            ingredient_id,
            amount,
        }
    }

    #[test]
    fn duplicate_ingredient_is_rejected() {
        let err = check_ingredient_lines(vec![line(1, 2), line(1, 3)]).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateIngredient { id: 1 }));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = check_ingredient_lines(vec![line(1, 0)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn tags_are_deduplicated_in_order() {
        assert_eq!(dedup_tags(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn missing_ids_are_sorted_and_unique() {
        let known: HashSet<i32> = [1, 2].into_iter().collect();
        assert_eq!(missing_ids(&[9, 1, 5, 9], &known), vec![5, 9]);
    }

    #[test]
    fn empty_sets_fail_the_create_update_precondition() {
        assert!(require_non_empty(&Composition::default()).is_err());
        let only_ingredients = Composition {
            ingredients: vec![line(1, 1)],
            tag_ids: vec![],
        };
        assert!(require_non_empty(&only_ingredients).is_err());
    }
}
