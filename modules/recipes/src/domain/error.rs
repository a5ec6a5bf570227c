use thiserror::Error;

use crate::contract::model::{IngredientId, RecipeId, TagId, UserId};

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Recipe not found: {id}")]
    RecipeNotFound { id: RecipeId },

    #[error("User not found: {id}")]
    UserNotFound { id: UserId },

    #[error("Tag not found: {id}")]
    TagNotFound { id: TagId },

    #[error("Ingredient not found: {id}")]
    IngredientNotFound { id: IngredientId },

    #[error("Unknown {kind} ids: {ids:?}")]
    ReferenceNotFound { kind: &'static str, ids: Vec<i32> },

    #[error("Ingredient {id} is listed more than once")]
    DuplicateIngredient { id: IngredientId },

    #[error("Invalid subscription: {message}")]
    InvalidSubscription { message: String },

    #[error("{what} already exists")]
    AlreadyExists { what: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Page not found")]
    PageNotFound,

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Media storage error: {message}")]
    Media { message: String },
}

impl DomainError {
    pub fn recipe_not_found(id: RecipeId) -> Self {
        Self::RecipeNotFound { id }
    }

    pub fn user_not_found(id: UserId) -> Self {
        Self::UserNotFound { id }
    }

    pub fn reference_not_found(kind: &'static str, ids: Vec<i32>) -> Self {
        Self::ReferenceNotFound { kind, ids }
    }

    pub fn invalid_subscription(message: impl Into<String>) -> Self {
        Self::InvalidSubscription {
            message: message.into(),
        }
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::Media {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        Self::database(format!("{e:#}"))
    }
}
