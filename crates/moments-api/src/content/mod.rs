//! Blog posts, comments and moments
//!
//! The content routes sit behind the auth layer; this module only stores
//! and lists records. Ownership checks (authors touching only their own
//! posts) happen in the handlers, where the caller's identity is known.

pub mod memory;
pub mod models;

pub use memory::MemoryContentStore;
pub use models::{Blog, Comment, Dashboard, Moment, NewBlog, NewComment, NewMoment};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Content errors
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),
}

/// Storage for content records
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All posts, newest first; drafts included only when asked
    async fn list_blogs(&self, include_drafts: bool) -> Vec<Blog>;
    async fn get_blog(&self, id: Uuid) -> Result<Blog, ContentError>;
    async fn blogs_by_author(&self, author: &str) -> Vec<Blog>;
    async fn add_blog(&self, blog: NewBlog, author: &str, author_name: &str) -> Blog;
    /// Remove a post and its comments
    async fn delete_blog(&self, id: Uuid) -> Result<Blog, ContentError>;
    async fn toggle_publish(&self, id: Uuid) -> Result<Blog, ContentError>;

    /// Queue a comment for approval
    async fn add_comment(&self, comment: NewComment) -> Result<Comment, ContentError>;
    /// Approved comments of one post, newest first
    async fn approved_comments(&self, blog_id: Uuid) -> Vec<Comment>;
    async fn all_comments(&self) -> Vec<Comment>;
    async fn approve_comment(&self, id: Uuid) -> Result<Comment, ContentError>;
    async fn delete_comment(&self, id: Uuid) -> Result<(), ContentError>;

    async fn dashboard(&self) -> Dashboard;

    /// All moments, latest `date` first
    async fn list_moments(&self) -> Vec<Moment>;
    async fn add_moment(&self, moment: NewMoment, created_by: &str) -> Moment;
    async fn delete_moment(&self, id: Uuid) -> Result<(), ContentError>;
}
