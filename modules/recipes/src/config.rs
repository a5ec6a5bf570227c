use serde::{Deserialize, Serialize};

/// Configuration for the recipes module (`modules.recipes` in the app config).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipesConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Directory for uploaded images; relative paths resolve against the server home dir.
    #[serde(default = "default_media_root")]
    pub media_root: String,
    /// URL prefix under which `media_root` is served.
    #[serde(default = "default_media_url")]
    pub media_url: String,
    #[serde(default = "default_shopping_list_title")]
    pub shopping_list_title: String,
    #[serde(default = "default_max_recipe_name_length")]
    pub max_recipe_name_length: usize,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            media_root: default_media_root(),
            media_url: default_media_url(),
            shopping_list_title: default_shopping_list_title(),
            max_recipe_name_length: default_max_recipe_name_length(),
        }
    }
}

fn default_page_size() -> u64 {
    6
}

fn default_max_page_size() -> u64 {
    100
}

fn default_media_root() -> String {
    "media".to_string()
}

fn default_media_url() -> String {
    "/media".to_string()
}

fn default_shopping_list_title() -> String {
    "Shopping list".to_string()
}

fn default_max_recipe_name_length() -> usize {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: RecipesConfig = serde_json::from_value(serde_json::json!({
            "default_page_size": 10
        }))
        .unwrap();
        assert_eq!(cfg.default_page_size, 10);
        assert_eq!(cfg.max_page_size, 100);
        assert_eq!(cfg.media_url, "/media");
        assert_eq!(cfg.shopping_list_title, "Shopping list");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<RecipesConfig, _> =
            serde_json::from_value(serde_json::json!({ "page_sise": 10 }));
        assert!(res.is_err());
    }
}
