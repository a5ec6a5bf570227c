use tracing::{debug, info, instrument};

use super::Service;
use crate::contract::model::{Ingredient, IngredientId, NewIngredient, NewTag, Tag, TagId};
use crate::domain::error::DomainError;

const MAX_TAG_FIELD_LEN: usize = 200;
const MAX_INGREDIENT_NAME_LEN: usize = 256;
const MAX_UNIT_LEN: usize = 16;

impl Service {
    #[instrument(name = "recipes.service.list_tags", skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<Tag>, DomainError> {
        let tags = self.repo.list_tags().await?;
        debug!("Listed {} tags", tags.len());
        Ok(tags)
    }

    #[instrument(name = "recipes.service.get_tag", skip(self))]
    pub async fn get_tag(&self, id: TagId) -> Result<Tag, DomainError> {
        self.repo
            .find_tag(id)
            .await?
            .ok_or(DomainError::TagNotFound { id })
    }

    #[instrument(name = "recipes.service.create_tag", skip(self), fields(slug = %tag.slug))]
    pub async fn create_tag(&self, tag: NewTag) -> Result<Tag, DomainError> {
        validate_tag(&tag)?;
        if self.repo.tag_conflicts(&tag).await? {
            return Err(DomainError::already_exists(format!(
                "Tag with this name, color or slug ('{}')",
                tag.slug
            )));
        }
        let tag = self.repo.insert_tag(tag).await?;
        info!("Created tag with id={}", tag.id);
        Ok(tag)
    }

    /// Create tags that do not clash with existing ones; returns how many were created.
    #[instrument(name = "recipes.service.load_tags", skip_all, fields(count = tags.len()))]
    pub async fn load_tags(&self, tags: Vec<NewTag>) -> Result<usize, DomainError> {
        for tag in &tags {
            validate_tag(tag)?;
        }
        let mut created = 0;
        for tag in tags {
            if self.repo.tag_conflicts(&tag).await? {
                debug!(slug = %tag.slug, "Tag already present, skipping");
                continue;
            }
            self.repo.insert_tag(tag).await?;
            created += 1;
        }
        info!("Loaded {} new tags", created);
        Ok(created)
    }

    #[instrument(name = "recipes.service.list_ingredients", skip(self))]
    pub async fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, DomainError> {
        let prefix = name_prefix.map(str::trim).filter(|p| !p.is_empty());
        let items = self.repo.list_ingredients(prefix).await?;
        debug!("Listed {} ingredients", items.len());
        Ok(items)
    }

    #[instrument(name = "recipes.service.get_ingredient", skip(self))]
    pub async fn get_ingredient(&self, id: IngredientId) -> Result<Ingredient, DomainError> {
        self.repo
            .find_ingredient(id)
            .await?
            .ok_or(DomainError::IngredientNotFound { id })
    }

    #[instrument(name = "recipes.service.create_ingredient", skip(self), fields(name = %item.name))]
    pub async fn create_ingredient(&self, item: NewIngredient) -> Result<Ingredient, DomainError> {
        validate_ingredient(&item)?;
        if self.repo.ingredient_exists(&item).await? {
            return Err(DomainError::already_exists(format!(
                "Ingredient '{}' ({})",
                item.name, item.measurement_unit
            )));
        }
        let created = self.repo.insert_ingredient(item).await?;
        info!("Created ingredient with id={}", created.id);
        Ok(created)
    }

    /// Get-or-create every (name, unit) pair; returns how many were created.
    #[instrument(name = "recipes.service.load_ingredients", skip_all, fields(count = items.len()))]
    pub async fn load_ingredients(&self, items: Vec<NewIngredient>) -> Result<usize, DomainError> {
        for item in &items {
            validate_ingredient(item)?;
        }
        let mut created = 0;
        for item in items {
            if self.repo.ingredient_exists(&item).await? {
                continue;
            }
            self.repo.insert_ingredient(item).await?;
            created += 1;
        }
        info!("Loaded {} new ingredients", created);
        Ok(created)
    }
}

fn validate_tag(tag: &NewTag) -> Result<(), DomainError> {
    for (field, value) in [("name", &tag.name), ("slug", &tag.slug)] {
        if value.trim().is_empty() {
            return Err(DomainError::validation(field, "must not be empty"));
        }
        if value.chars().count() > MAX_TAG_FIELD_LEN {
            return Err(DomainError::validation(
                field,
                format!("at most {MAX_TAG_FIELD_LEN} characters"),
            ));
        }
    }
    if !tag
        .slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::validation(
            "slug",
            "only latin letters, digits, '-' and '_' are allowed",
        ));
    }
    if !is_hex_color(&tag.color) {
        return Err(DomainError::validation(
            "color",
            format!("'{}' is not a #RRGGBB color", tag.color),
        ));
    }
    Ok(())
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_ingredient(item: &NewIngredient) -> Result<(), DomainError> {
    let checks = [
        ("name", &item.name, MAX_INGREDIENT_NAME_LEN),
        ("measurement_unit", &item.measurement_unit, MAX_UNIT_LEN),
    ];
    for (field, value, max) in checks {
        if value.trim().is_empty() {
            return Err(DomainError::validation(field, "must not be empty"));
        }
        if value.chars().count() > max {
            return Err(DomainError::validation(
                field,
                format!("at most {max} characters"),
            ));
        }
    }
    Ok(())
}
