// === PUBLIC CONTRACT ===
// Plain data types shared by the REST layer, the CLI loaders and other modules.
pub mod contract;

pub use contract::{client::RecipesApi, error::RecipesError, model};

// === MODULE DEFINITION ===
// Wiring of repository, image store and service; used by the server binary.
pub mod module;
pub use module::RecipesModule;

pub mod config;
pub use config::RecipesConfig;

// === INTERNAL MODULES ===
// Exposed for integration tests; external consumers should stick to `contract`
// and `RecipesModule`.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
