use api_ingress::problem::{Problem, ProblemResponse, ValidationError};
use axum::http::StatusCode;

use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.foodgram.dev/{}", code))
        .with_code(code)
        .with_instance(instance);

    // Add trace id from current tracing span if available
    let problem = if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    };

    ProblemResponse(problem)
}

fn with_pointer(mut resp: ProblemResponse, field: &str, detail: &str) -> ProblemResponse {
    resp.0 = resp.0.with_errors(vec![ValidationError {
        detail: detail.to_string(),
        pointer: format!("/{field}"),
    }]);
    resp
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::RecipeNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "RECIPES_NOT_FOUND",
            "Recipe not found",
            format!("Recipe with id {} was not found", id),
            instance,
        ),
        DomainError::UserNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "USERS_NOT_FOUND",
            "User not found",
            format!("User with id {} was not found", id),
            instance,
        ),
        DomainError::TagNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "TAGS_NOT_FOUND",
            "Tag not found",
            format!("Tag with id {} was not found", id),
            instance,
        ),
        DomainError::IngredientNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "INGREDIENTS_NOT_FOUND",
            "Ingredient not found",
            format!("Ingredient with id {} was not found", id),
            instance,
        ),
        DomainError::PageNotFound => from_parts(
            StatusCode::NOT_FOUND,
            "PAGE_NOT_FOUND",
            "Page not found",
            "Invalid page",
            instance,
        ),
        DomainError::ReferenceNotFound { kind, ids } => {
            let detail = format!("Unknown {} ids: {:?}", kind, ids);
            with_pointer(
                from_parts(
                    StatusCode::BAD_REQUEST,
                    "RECIPES_REFERENCE_NOT_FOUND",
                    "Unknown reference",
                    detail.clone(),
                    instance,
                ),
                &format!("{kind}s"),
                &detail,
            )
        }
        DomainError::DuplicateIngredient { id } => {
            let detail = format!("Ingredient {} is listed more than once", id);
            with_pointer(
                from_parts(
                    StatusCode::BAD_REQUEST,
                    "RECIPES_DUPLICATE_INGREDIENT",
                    "Duplicate ingredient",
                    detail.clone(),
                    instance,
                ),
                "ingredients",
                &detail,
            )
        }
        DomainError::InvalidSubscription { message } => from_parts(
            StatusCode::BAD_REQUEST,
            "USERS_INVALID_SUBSCRIPTION",
            "Invalid subscription",
            message.clone(),
            instance,
        ),
        DomainError::AlreadyExists { what } => from_parts(
            StatusCode::BAD_REQUEST,
            "ALREADY_EXISTS",
            "Already exists",
            format!("{} already exists", what),
            instance,
        ),
        DomainError::Validation { field, message } => with_pointer(
            from_parts(
                StatusCode::BAD_REQUEST,
                "VALIDATION",
                "Validation error",
                format!("{}", e),
                instance,
            ),
            field,
            message,
        ),
        DomainError::InvalidCredentials => from_parts(
            StatusCode::BAD_REQUEST,
            "AUTH_INVALID_CREDENTIALS",
            "Invalid credentials",
            "Unable to log in with provided credentials",
            instance,
        ),
        DomainError::Unauthenticated => from_parts(
            StatusCode::UNAUTHORIZED,
            "AUTH_REQUIRED",
            "Unauthorized",
            "Authentication credentials were not provided or are invalid",
            instance,
        ),
        DomainError::Forbidden { message } => from_parts(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Forbidden",
            message.clone(),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
        DomainError::Media { .. } => {
            tracing::error!(error = ?e, "Media storage error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_MEDIA",
                "Internal error",
                "An internal storage error occurred",
                instance,
            )
        }
    }
}
