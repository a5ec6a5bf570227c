use crate::contract::model::{Ingredient, Recipe, RecipeIngredient, Tag, User};
use crate::domain::repo::UserCredentials;
use crate::infra::storage::entity::{ingredient, recipe, recipe_ingredient, tag, user};

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            username: m.username,
            first_name: m.first_name,
            last_name: m.last_name,
        }
    }
}

impl From<user::Model> for UserCredentials {
    fn from(mut m: user::Model) -> Self {
        let password_hash = std::mem::take(&mut m.password_hash);
        Self {
            user: m.into(),
            password_hash,
        }
    }
}

impl From<tag::Model> for Tag {
    fn from(m: tag::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            color: m.color,
            slug: m.slug,
        }
    }
}

impl From<ingredient::Model> for Ingredient {
    fn from(m: ingredient::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            measurement_unit: m.measurement_unit,
        }
    }
}

impl From<recipe::Model> for Recipe {
    fn from(m: recipe::Model) -> Self {
        Self {
            id: m.id,
            author_id: m.author_id,
            name: m.name,
            image: m.image,
            text: m.text,
            cooking_time: m.cooking_time,
            created_at: m.created_at,
        }
    }
}

/// Join a composition row with its catalogue entry.
pub fn recipe_ingredient(
    line: recipe_ingredient::Model,
    item: ingredient::Model,
) -> RecipeIngredient {
    RecipeIngredient {
        id: item.id,
        name: item.name,
        measurement_unit: item.measurement_unit,
        amount: line.amount,
    }
}
