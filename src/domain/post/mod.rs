pub mod model;
pub mod repository;

pub use model::BlogPost;
pub use repository::{BlogPostRepository, PgBlogPostRepository};
