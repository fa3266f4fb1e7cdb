pub mod model;
pub mod repository;

pub use model::BlogUser;
pub use repository::{BlogUserRepository, PgBlogUserRepository};
