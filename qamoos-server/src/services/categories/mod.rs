pub mod categories_service;
pub mod categories_shared;

pub use categories_service::CategoriesService;
pub use categories_shared::CategoryDraft;
