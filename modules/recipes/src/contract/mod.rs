pub mod client;
pub mod error;
pub mod model;

pub use client::RecipesApi;
pub use error::RecipesError;
pub use model::{
    AuthorSubscription, Composition, Ingredient, IngredientAmount, NewIngredient, NewRecipe,
    NewTag, NewUser, Page, PageRequest, Recipe, RecipeDetails, RecipeFilter, RecipeIngredient,
    RecipeList, RecipeUpdate, ShoppingListItem, Tag, User, UserView,
};
