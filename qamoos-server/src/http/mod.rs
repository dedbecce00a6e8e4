//! HTTP surface under `/api`. Every success body is `{"success": true, ...}`.

pub mod auth_routes;
pub mod categories_routes;
pub mod words_routes;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

impl SearchParams {
    pub fn needle(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }
}
