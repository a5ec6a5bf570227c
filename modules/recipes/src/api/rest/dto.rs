use axum::http::Uri;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::contract::model::{
    AuthorSubscription, Ingredient, IngredientAmount, NewRecipe, NewUser, Page, PageRequest,
    Recipe, RecipeDetails, RecipeFilter, RecipeIngredient, RecipeUpdate, Tag, User, UserView,
};

// ---- users & auth ----

/// A user as shown to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the caller follows this user.
    pub is_subscribed: bool,
}

/// Registration response; carries no relation flags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreatedDto {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenDto {
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetPasswordReq {
    pub current_password: String,
    pub new_password: String,
}

// ---- catalogue ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagDto {
    pub id: i32,
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngredientDto {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IngredientsQuery {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

// ---- recipes ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredientDto {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeDto {
    pub id: i32,
    pub tags: Vec<TagDto>,
    pub author: UserDto,
    pub ingredients: Vec<RecipeIngredientDto>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image_url: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Short recipe form used in favorites, the cart and subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeShortDto {
    pub id: i32,
    pub name: String,
    pub image_url: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct IngredientAmountReq {
    /// Ingredient id.
    pub id: i32,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRecipeReq {
    pub ingredients: Vec<IngredientAmountReq>,
    /// Tag ids.
    pub tags: Vec<i32>,
    /// Base64 image, optionally prefixed with `data:image/<ext>;base64,`.
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Recipe update; everything but the image is required.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateRecipeReq {
    pub ingredients: Vec<IngredientAmountReq>,
    pub tags: Vec<i32>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Recipe list parameters. `tags` may repeat; boolean flags accept `1`/`0`
/// and `true`/`false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Author id.
    pub author: Option<i32>,
    /// Tag slugs; a recipe matches if it has any of them.
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeListQuery {
    /// Parse a raw query string. Unknown parameters are ignored.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        let mut q = Self::default();
        let Some(raw) = raw else {
            return Ok(q);
        };
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "page" => q.page = Some(parse_num(&key, &value)?),
                "limit" => q.limit = Some(parse_num(&key, &value)?),
                "author" => q.author = Some(parse_num(&key, &value)?),
                "tags" if !value.is_empty() => q.tags.push(value.into_owned()),
                "is_favorited" => q.is_favorited = Some(parse_flag(&key, &value)?),
                "is_in_shopping_cart" => {
                    q.is_in_shopping_cart = Some(parse_flag(&key, &value)?)
                }
                _ => {}
            }
        }
        Ok(q)
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            author: self.author,
            tags: self.tags.clone(),
            is_favorited: self.is_favorited.unwrap_or(false),
            is_in_shopping_cart: self.is_in_shopping_cart.unwrap_or(false),
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("'{key}' must be a number, got '{value}'"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        _ => Err(format!("'{key}' must be 0/1 or true/false, got '{value}'")),
    }
}

// ---- subscriptions ----

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionDto {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShortDto>,
    pub recipes_count: u64,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscriptionsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Maximum number of recipes shown per author.
    pub recipes_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<u64>,
}

// ---- pagination ----

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Page size override.
    pub limit: Option<u64>,
}

impl From<&PageQuery> for PageRequest {
    fn from(q: &PageQuery) -> Self {
        Self {
            page: q.page,
            limit: q.limit,
        }
    }
}

/// Page envelope with navigation links relative to the request path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PageDto<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageDto<T> {
    pub fn from_page<U>(page: Page<U>, uri: &Uri, f: impl FnMut(U) -> T) -> Self {
        let next = page.has_next().then(|| page_link(uri, page.page + 1));
        let previous = page.has_previous().then(|| page_link(uri, page.page - 1));
        Self {
            count: page.total,
            next,
            previous,
            results: page.items.into_iter().map(f).collect(),
        }
    }
}

/// The request path with its `page` parameter replaced. Page 1 drops it.
fn page_link(uri: &Uri, page: u64) -> String {
    let pairs = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .filter(|(k, _)| k != "page");
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.extend_pairs(pairs);
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<UserView> for UserDto {
    fn from(view: UserView) -> Self {
        let UserView {
            user,
            is_subscribed,
        } = view;
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

impl From<User> for UserCreatedDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
        }
    }
}

impl From<Tag> for TagDto {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

impl From<Ingredient> for IngredientDto {
    fn from(item: Ingredient) -> Self {
        Self {
            id: item.id,
            name: item.name,
            measurement_unit: item.measurement_unit,
        }
    }
}

impl From<RecipeIngredient> for RecipeIngredientDto {
    fn from(line: RecipeIngredient) -> Self {
        Self {
            id: line.id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        }
    }
}

impl From<IngredientAmountReq> for IngredientAmount {
    fn from(req: IngredientAmountReq) -> Self {
        Self {
            ingredient_id: req.id,
            amount: req.amount,
        }
    }
}

impl From<CreateRecipeReq> for NewRecipe {
    fn from(req: CreateRecipeReq) -> Self {
        Self {
            name: req.name,
            text: req.text,
            cooking_time: req.cooking_time,
            image: req.image,
            ingredients: req.ingredients.into_iter().map(Into::into).collect(),
            tags: req.tags,
        }
    }
}

impl From<UpdateRecipeReq> for RecipeUpdate {
    fn from(req: UpdateRecipeReq) -> Self {
        Self {
            name: req.name,
            text: req.text,
            cooking_time: req.cooking_time,
            image: req.image,
            ingredients: req.ingredients.into_iter().map(Into::into).collect(),
            tags: req.tags,
        }
    }
}

impl RecipeDto {
    /// `image_url` maps the stored media path to its public URL.
    pub fn from_details(details: RecipeDetails, image_url: impl Fn(&str) -> String) -> Self {
        let RecipeDetails {
            recipe,
            author,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        } = details;
        Self {
            id: recipe.id,
            tags: tags.into_iter().map(TagDto::from).collect(),
            author: author.into(),
            ingredients: ingredients
                .into_iter()
                .map(RecipeIngredientDto::from)
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            image_url: image_url(&recipe.image),
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

impl RecipeShortDto {
    pub fn from_recipe(recipe: Recipe, image_url: impl Fn(&str) -> String) -> Self {
        Self {
            id: recipe.id,
            image_url: image_url(&recipe.image),
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }
}

impl SubscriptionDto {
    pub fn from_subscription(
        sub: AuthorSubscription,
        image_url: impl Fn(&str) -> String,
    ) -> Self {
        let author = UserDto::from(sub.author);
        Self {
            id: author.id,
            email: author.email,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: author.is_subscribed,
            recipes: sub
                .recipes
                .into_iter()
                .map(|r| RecipeShortDto::from_recipe(r, &image_url))
                .collect(),
            recipes_count: sub.recipes_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_query_collects_repeated_tags() {
        let q = RecipeListQuery::parse(Some(
            "tags=breakfast&tags=lunch&author=3&is_favorited=1&limit=2&page=4&x=y",
        ))
        .unwrap();
        assert_eq!(q.tags, vec!["breakfast", "lunch"]);
        assert_eq!(q.author, Some(3));
        assert_eq!(q.is_favorited, Some(true));
        assert_eq!(q.is_in_shopping_cart, None);
        assert_eq!(q.page_request(), PageRequest { page: Some(4), limit: Some(2) });
    }

    #[test]
    fn recipe_query_rejects_garbage() {
        assert!(RecipeListQuery::parse(Some("author=abc")).is_err());
        assert!(RecipeListQuery::parse(Some("is_in_shopping_cart=maybe")).is_err());
        assert_eq!(RecipeListQuery::parse(None).unwrap(), RecipeListQuery::default());
    }

    #[test]
    fn page_links_rewrite_only_the_page() {
        let uri: Uri = "/api/recipes?tags=lunch&page=2&limit=1".parse().unwrap();
        let page = Page {
            items: vec![1],
            total: 3,
            page: 2,
            limit: 1,
        };
        let dto = PageDto::from_page(page, &uri, |x| x);
        assert_eq!(
            dto.next.as_deref(),
            Some("/api/recipes?tags=lunch&limit=1&page=3")
        );
        assert_eq!(dto.previous.as_deref(), Some("/api/recipes?tags=lunch&limit=1"));
        assert_eq!(dto.count, 3);
    }

    #[test]
    fn last_page_has_no_next_link() {
        let uri: Uri = "/api/users".parse().unwrap();
        let page = Page {
            items: vec![1, 2],
            total: 2,
            page: 1,
            limit: 6,
        };
        let dto = PageDto::from_page(page, &uri, |x| x);
        assert!(dto.next.is_none());
        assert!(dto.previous.is_none());
    }
}
