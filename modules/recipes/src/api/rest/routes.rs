use std::sync::Arc;

use api_ingress::problem::{Problem, ValidationError};
use axum::{
    routing::{get, post},
    Extension, Router,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

/// OpenAPI document for every route registered by [`register_routes`].
#[derive(OpenApi)]
#[openapi(
    info(title = "Foodgram API", description = "Recipes, users and shopping lists"),
    paths(
        handlers::register_user,
        handlers::list_users,
        handlers::me,
        handlers::get_user,
        handlers::set_password,
        handlers::list_subscriptions,
        handlers::subscribe,
        handlers::unsubscribe,
        handlers::login,
        handlers::logout,
        handlers::list_tags,
        handlers::get_tag,
        handlers::list_ingredients,
        handlers::get_ingredient,
        handlers::list_recipes,
        handlers::create_recipe,
        handlers::get_recipe,
        handlers::update_recipe,
        handlers::delete_recipe,
        handlers::add_favorite,
        handlers::remove_favorite,
        handlers::add_to_cart,
        handlers::remove_from_cart,
        handlers::download_shopping_cart,
    ),
    components(schemas(
        Problem,
        ValidationError,
        dto::UserDto,
        dto::UserCreatedDto,
        dto::CreateUserReq,
        dto::LoginReq,
        dto::TokenDto,
        dto::SetPasswordReq,
        dto::TagDto,
        dto::IngredientDto,
        dto::RecipeDto,
        dto::RecipeShortDto,
        dto::RecipeIngredientDto,
        dto::IngredientAmountReq,
        dto::CreateRecipeReq,
        dto::UpdateRecipeReq,
        dto::SubscriptionDto,
    )),
    modifiers(&TokenAuth),
    tags(
        (name = "users", description = "Registration, profiles and subscriptions"),
        (name = "auth", description = "Token login and logout"),
        (name = "tags", description = "Recipe tags"),
        (name = "ingredients", description = "Ingredient catalogue"),
        (name = "recipes", description = "Recipes, favorites and the shopping cart"),
    )
)]
pub struct RecipesApiDoc;

/// `Authorization: Token <key>`
struct TokenAuth;

impl Modify for TokenAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "Token <key> as returned by /api/auth/token/login",
            ))),
        );
    }
}

/// Mount the module's routes under `/api`. Static segments such as
/// `/users/me` take priority over `/users/{id}`.
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    let api = Router::new()
        // users
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::register_user),
        )
        .route("/api/users/me", get(handlers::me))
        .route("/api/users/set_password", post(handlers::set_password))
        .route("/api/users/subscriptions", get(handlers::list_subscriptions))
        .route("/api/users/{id}", get(handlers::get_user))
        .route(
            "/api/users/{id}/subscribe",
            post(handlers::subscribe).delete(handlers::unsubscribe),
        )
        // auth
        .route("/api/auth/token/login", post(handlers::login))
        .route("/api/auth/token/logout", post(handlers::logout))
        // catalogue
        .route("/api/tags", get(handlers::list_tags))
        .route("/api/tags/{id}", get(handlers::get_tag))
        .route("/api/ingredients", get(handlers::list_ingredients))
        .route("/api/ingredients/{id}", get(handlers::get_ingredient))
        // recipes
        .route(
            "/api/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(handlers::download_shopping_cart),
        )
        .route(
            "/api/recipes/{id}",
            get(handlers::get_recipe)
                .patch(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(handlers::add_to_cart).delete(handlers::remove_from_cart),
        )
        .layer(Extension(service));

    router.merge(api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = RecipesApiDoc::openapi();
        let v = serde_json::to_value(&doc).unwrap();
        for path in [
            "/api/users",
            "/api/users/me",
            "/api/users/{id}/subscribe",
            "/api/auth/token/login",
            "/api/recipes/{id}",
            "/api/recipes/download_shopping_cart",
        ] {
            assert!(
                v["paths"].get(path).is_some(),
                "missing {path} in OpenAPI document"
            );
        }
        assert!(v.pointer("/components/securitySchemes/token").is_some());
        assert!(v.pointer("/components/schemas/Problem").is_some());
    }
}
