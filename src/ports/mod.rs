pub mod author_repository;
pub mod book_repository;
pub mod error;
pub mod health_probe;
pub mod loan_repository;
pub mod member_repository;
pub mod views;

pub use author_repository::*;
pub use book_repository::*;
pub use error::*;
pub use health_probe::*;
pub use loan_repository::*;
pub use member_repository::*;
pub use views::*;
