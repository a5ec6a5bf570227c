use chrono::{DateTime, Utc};

pub type UserId = i32;
pub type RecipeId = i32;
pub type TagId = i32;
pub type IngredientId = i32;

/// Registered user as seen by other users (no credentials).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// A user rendered for a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub user: User,
    /// Whether the viewer follows this user; always false for anonymous viewers.
    pub is_subscribed: bool,
}

/// Registration data; `password` is plain text and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

/// One requested line of a recipe composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

/// The full ingredient and tag set of a recipe, replaced as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composition {
    pub ingredients: Vec<IngredientAmount>,
    pub tag_ids: Vec<TagId>,
}

/// An ingredient line of a stored recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Recipe row without its relations. `image` is the stored media path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// A recipe hydrated for a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: UserView,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Recipe creation data. `image` is a base64 data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<TagId>,
}

/// Recipe update data. The composition is always replaced; the image only when given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<TagId>,
}

/// Recipe list filters. Tag slugs are OR-ed; the list flags only apply to
/// authenticated viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Per-user recipe lists with identical semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    pub fn as_str(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }
}

/// An author the user follows, with a preview of the author's recipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSubscription {
    pub author: UserView,
    pub recipes: Vec<Recipe>,
    pub recipes_count: u64,
}

/// One aggregated shopping list line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Requested page; `page` is 1-based. Missing values take configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of results plus what is needed to build navigation links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.limit) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}
