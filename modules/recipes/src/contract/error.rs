use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipesError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{what} already exists")]
    Conflict { what: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not allowed: {message}")]
    Forbidden { message: String },

    #[error("Internal error")]
    Internal,
}

impl RecipesError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict { what: what.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for RecipesError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            RecipeNotFound { id } => Self::not_found(format!("Recipe {id}")),
            UserNotFound { id } => Self::not_found(format!("User {id}")),
            TagNotFound { id } => Self::not_found(format!("Tag {id}")),
            IngredientNotFound { id } => Self::not_found(format!("Ingredient {id}")),
            PageNotFound => Self::not_found("Page"),
            AlreadyExists { what } => Self::conflict(what),
            e @ (ReferenceNotFound { .. }
            | DuplicateIngredient { .. }
            | InvalidSubscription { .. }
            | Validation { .. }
            | InvalidCredentials) => Self::validation(e.to_string()),
            Unauthenticated => Self::Forbidden {
                message: "authentication required".to_string(),
            },
            Forbidden { message } => Self::Forbidden { message },
            Database { .. } | Media { .. } => Self::internal(),
        }
    }
}
