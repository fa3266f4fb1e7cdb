pub mod lifecycle;
pub mod model;
pub mod repository;

pub use model::BlogTag;
pub use repository::{BlogTagRepository, PgBlogTagRepository};
