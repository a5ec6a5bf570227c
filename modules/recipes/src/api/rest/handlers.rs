use std::sync::Arc;

use api_ingress::problem::{bad_request, Problem, ProblemResponse};
use axum::{
    extract::RawQuery,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json},
    Extension,
};
use tracing::{error, info};

use crate::api::rest::auth::{CurrentUser, MaybeUser};
use crate::api::rest::dto::{
    CreateRecipeReq, CreateUserReq, IngredientDto, IngredientsQuery, LoginReq, PageDto,
    PageQuery, RecipeDto, RecipeListQuery, RecipeShortDto, SetPasswordReq, SubscribeQuery,
    SubscriptionDto, SubscriptionsQuery, TagDto, TokenDto, UpdateRecipeReq, UserCreatedDto,
    UserDto,
};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::contract::model::{PageRequest, RecipeDetails, RecipeId, TagId, UserId};
use crate::domain::service::Service;

const SHOPPING_LIST_FILENAME: &str = "shop_list.txt";

fn recipe_dto(svc: &Service, details: RecipeDetails) -> RecipeDto {
    RecipeDto::from_details(details, |path| svc.image_url(path))
}

// ---- users ----

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User registered", body = UserCreatedDto),
        (status = 400, description = "Invalid or duplicate data", body = Problem),
    )
)]
pub async fn register_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(req_body): ApiJson<CreateUserReq>,
) -> Result<(StatusCode, Json<UserCreatedDto>), ProblemResponse> {
    info!("Registering user '{}'", req_body.username);

    match svc.register_user(req_body.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserCreatedDto::from(user)))),
        Err(e) => {
            error!("Failed to register user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = PageDto<UserDto>),
        (status = 404, description = "Page past the end", body = Problem),
    )
)]
pub async fn list_users(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<PageDto<UserDto>>, ProblemResponse> {
    info!("Listing users with query: {:?}", query);

    match svc.list_users(viewer.id(), PageRequest::from(&query)).await {
        Ok(page) => Ok(Json(PageDto::from_page(page, &uri, UserDto::from))),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    security(("token" = [])),
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn me(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
) -> Result<Json<UserDto>, ProblemResponse> {
    match svc.get_user(Some(user.id()), user.id()).await {
        Ok(view) => Ok(Json(UserDto::from(view))),
        Err(e) => {
            error!("Failed to load current user {}: {}", user.id(), e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn get_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<UserDto>, ProblemResponse> {
    info!("Getting user with id: {}", id);

    match svc.get_user(viewer.id(), id).await {
        Ok(view) => Ok(Json(UserDto::from(view))),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/users/set_password",
    tag = "users",
    security(("token" = [])),
    request_body = SetPasswordReq,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or weak new one", body = Problem),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn set_password(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiJson(req_body): ApiJson<SetPasswordReq>,
) -> Result<StatusCode, ProblemResponse> {
    info!("Changing password for user {}", user.id());

    match svc
        .set_password(user.id(), &req_body.current_password, &req_body.new_password)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to change password for user {}: {}", user.id(), e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Authors the caller follows
#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    security(("token" = [])),
    params(SubscriptionsQuery),
    responses(
        (status = 200, description = "Page of followed authors", body = PageDto<SubscriptionDto>),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn list_subscriptions(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<SubscriptionsQuery>,
) -> Result<Json<PageDto<SubscriptionDto>>, ProblemResponse> {
    info!("Listing subscriptions of user {}", user.id());

    let req = PageRequest {
        page: query.page,
        limit: query.limit,
    };
    match svc
        .list_subscriptions(user.id(), req, query.recipes_limit)
        .await
    {
        Ok(page) => Ok(Json(PageDto::from_page(page, &uri, |sub| {
            SubscriptionDto::from_subscription(sub, |p| svc.image_url(p))
        }))),
        Err(e) => {
            error!("Failed to list subscriptions: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Follow an author
#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Author id"), SubscribeQuery),
    responses(
        (status = 201, description = "Subscribed", body = SubscriptionDto),
        (status = 400, description = "Self or duplicate subscription", body = Problem),
        (status = 404, description = "Unknown author", body = Problem),
    )
)]
pub async fn subscribe(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<UserId>,
    ApiQuery(query): ApiQuery<SubscribeQuery>,
) -> Result<(StatusCode, Json<SubscriptionDto>), ProblemResponse> {
    info!("User {} subscribing to {}", user.id(), id);

    match svc.subscribe(user.id(), id, query.recipes_limit).await {
        Ok(sub) => Ok((
            StatusCode::CREATED,
            Json(SubscriptionDto::from_subscription(sub, |p| svc.image_url(p))),
        )),
        Err(e) => {
            error!("Failed to subscribe to {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Stop following an author
#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Author id")),
    responses(
        (status = 204, description = "Not following the author anymore"),
        (status = 404, description = "Unknown author", body = Problem),
    )
)]
pub async fn unsubscribe(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode, ProblemResponse> {
    info!("User {} unsubscribing from {}", user.id(), id);

    match svc.unsubscribe(user.id(), id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to unsubscribe from {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

// ---- auth ----

/// Exchange credentials for an auth token
#[utoipa::path(
    post,
    path = "/api/auth/token/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token issued", body = TokenDto),
        (status = 400, description = "Invalid credentials", body = Problem),
    )
)]
pub async fn login(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(req_body): ApiJson<LoginReq>,
) -> Result<Json<TokenDto>, ProblemResponse> {
    match svc.login(&req_body.email, &req_body.password).await {
        Ok(auth_token) => Ok(Json(TokenDto { auth_token })),
        Err(e) => {
            info!("Login rejected: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Revoke the caller's token
#[utoipa::path(
    post,
    path = "/api/auth/token/logout",
    tag = "auth",
    security(("token" = [])),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn logout(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
) -> Result<StatusCode, ProblemResponse> {
    match svc.logout(user.id()).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to log out user {}: {}", user.id(), e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

// ---- tags & ingredients ----

/// List tags
#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    responses((status = 200, description = "All tags", body = Vec<TagDto>))
)]
pub async fn list_tags(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<Vec<TagDto>>, ProblemResponse> {
    match svc.list_tags().await {
        Ok(tags) => Ok(Json(tags.into_iter().map(TagDto::from).collect())),
        Err(e) => {
            error!("Failed to list tags: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a tag by id
#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    tag = "tags",
    params(("id" = i32, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag found", body = TagDto),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn get_tag(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ApiPath(id): ApiPath<TagId>,
) -> Result<Json<TagDto>, ProblemResponse> {
    match svc.get_tag(id).await {
        Ok(tag) => Ok(Json(TagDto::from(tag))),
        Err(e) => {
            error!("Failed to get tag {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List ingredients, optionally by name prefix
#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    params(IngredientsQuery),
    responses((status = 200, description = "Matching ingredients", body = Vec<IngredientDto>))
)]
pub async fn list_ingredients(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ApiQuery(query): ApiQuery<IngredientsQuery>,
) -> Result<Json<Vec<IngredientDto>>, ProblemResponse> {
    match svc.list_ingredients(query.name.as_deref()).await {
        Ok(items) => Ok(Json(items.into_iter().map(IngredientDto::from).collect())),
        Err(e) => {
            error!("Failed to list ingredients: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get an ingredient by id
#[utoipa::path(
    get,
    path = "/api/ingredients/{id}",
    tag = "ingredients",
    params(("id" = i32, Path, description = "Ingredient id")),
    responses(
        (status = 200, description = "Ingredient found", body = IngredientDto),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn get_ingredient(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<IngredientDto>, ProblemResponse> {
    match svc.get_ingredient(id).await {
        Ok(item) => Ok(Json(IngredientDto::from(item))),
        Err(e) => {
            error!("Failed to get ingredient {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

// ---- recipes ----

/// List recipes, newest first
#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Page of recipes", body = PageDto<RecipeDto>),
        (status = 400, description = "Malformed filter", body = Problem),
        (status = 404, description = "Page past the end", body = Problem),
    )
)]
pub async fn list_recipes(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    viewer: MaybeUser,
    RawQuery(raw): RawQuery,
) -> Result<Json<PageDto<RecipeDto>>, ProblemResponse> {
    let query = RecipeListQuery::parse(raw.as_deref()).map_err(|msg| {
        let mut resp = bad_request(msg);
        resp.0.instance = uri.path().to_string();
        resp
    })?;
    info!("Listing recipes with query: {:?}", query);

    match svc
        .list_recipes(viewer.id(), query.filter(), query.page_request())
        .await
    {
        Ok(page) => Ok(Json(PageDto::from_page(page, &uri, |d| recipe_dto(&svc, d)))),
        Err(e) => {
            error!("Failed to list recipes: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Publish a recipe
#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    security(("token" = [])),
    request_body = CreateRecipeReq,
    responses(
        (status = 201, description = "Created recipe", body = RecipeDto),
        (status = 400, description = "Invalid recipe", body = Problem),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn create_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiJson(req_body): ApiJson<CreateRecipeReq>,
) -> Result<(StatusCode, Json<RecipeDto>), ProblemResponse> {
    info!("User {} creating recipe '{}'", user.id(), req_body.name);

    match svc.create_recipe(user.id(), req_body.into()).await {
        Ok(details) => Ok((StatusCode::CREATED, Json(recipe_dto(&svc, details)))),
        Err(e) => {
            error!("Failed to create recipe: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a recipe by id
#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe found", body = RecipeDto),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn get_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<RecipeId>,
) -> Result<Json<RecipeDto>, ProblemResponse> {
    info!("Getting recipe with id: {}", id);

    match svc.get_recipe(viewer.id(), id).await {
        Ok(details) => Ok(Json(recipe_dto(&svc, details))),
        Err(e) => {
            error!("Failed to get recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Update a recipe; only its author may do so
#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Recipe id")),
    request_body = UpdateRecipeReq,
    responses(
        (status = 200, description = "Updated recipe", body = RecipeDto),
        (status = 400, description = "Invalid recipe", body = Problem),
        (status = 403, description = "Not the author", body = Problem),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn update_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<RecipeId>,
    ApiJson(req_body): ApiJson<UpdateRecipeReq>,
) -> Result<Json<RecipeDto>, ProblemResponse> {
    info!("User {} updating recipe {}", user.id(), id);

    match svc.update_recipe(user.id(), id, req_body.into()).await {
        Ok(details) => Ok(Json(recipe_dto(&svc, details))),
        Err(e) => {
            error!("Failed to update recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete a recipe; only its author may do so
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 403, description = "Not the author", body = Problem),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn delete_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<RecipeId>,
) -> Result<StatusCode, ProblemResponse> {
    info!("User {} deleting recipe {}", user.id(), id);

    match svc.delete_recipe(user.id(), id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Add a recipe to the caller's favorites
#[utoipa::path(
    post,
    path = "/api/recipes/{id}/favorite",
    tag = "recipes",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Added", body = RecipeShortDto),
        (status = 400, description = "Already a favorite", body = Problem),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn add_favorite(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<RecipeId>,
) -> Result<(StatusCode, Json<RecipeShortDto>), ProblemResponse> {
    match svc.add_favorite(user.id(), id).await {
        Ok(recipe) => Ok((
            StatusCode::CREATED,
            Json(RecipeShortDto::from_recipe(recipe, |p| svc.image_url(p))),
        )),
        Err(e) => {
            error!("Failed to favorite recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Remove a recipe from the caller's favorites
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/favorite",
    tag = "recipes",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Not a favorite anymore"),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn remove_favorite(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<RecipeId>,
) -> Result<StatusCode, ProblemResponse> {
    match svc.remove_favorite(user.id(), id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to unfavorite recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Put a recipe into the caller's shopping cart
#[utoipa::path(
    post,
    path = "/api/recipes/{id}/shopping_cart",
    tag = "recipes",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Added", body = RecipeShortDto),
        (status = 400, description = "Already in the cart", body = Problem),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn add_to_cart(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<RecipeId>,
) -> Result<(StatusCode, Json<RecipeShortDto>), ProblemResponse> {
    match svc.add_to_cart(user.id(), id).await {
        Ok(recipe) => Ok((
            StatusCode::CREATED,
            Json(RecipeShortDto::from_recipe(recipe, |p| svc.image_url(p))),
        )),
        Err(e) => {
            error!("Failed to add recipe {} to cart: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Take a recipe out of the caller's shopping cart
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/shopping_cart",
    tag = "recipes",
    security(("token" = [])),
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Not in the cart anymore"),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn remove_from_cart(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<RecipeId>,
) -> Result<StatusCode, ProblemResponse> {
    match svc.remove_from_cart(user.id(), id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to remove recipe {} from cart: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Download the aggregated shopping list as a text file
#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    tag = "recipes",
    security(("token" = [])),
    responses(
        (status = 200, description = "Shopping list", body = String, content_type = "text/plain"),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn download_shopping_cart(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ProblemResponse> {
    info!("User {} downloading shopping list", user.id());

    match svc.shopping_list_text(user.id()).await {
        Ok(text) => Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
                ),
            ],
            text,
        )),
        Err(e) => {
            error!("Failed to build shopping list: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
