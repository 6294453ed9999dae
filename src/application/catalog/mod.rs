mod author_service;
mod book_service;
mod errors;
mod member_service;

use crate::ports::{AuthorRepository, BookRepository, MemberRepository};
use std::sync::Arc;

pub use author_service::*;
pub use book_service::*;
pub use errors::{CatalogError, Result};
pub use member_service::*;

/// カタログ管理サービスの依存関係
#[derive(Clone)]
pub struct CatalogDependencies {
    pub authors: Arc<dyn AuthorRepository>,
    pub books: Arc<dyn BookRepository>,
    pub members: Arc<dyn MemberRepository>,
}
