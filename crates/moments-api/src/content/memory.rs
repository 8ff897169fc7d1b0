use super::{
    Blog, Comment, ContentError, ContentStore, Dashboard, Moment, NewBlog, NewComment, NewMoment,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Number of posts shown on the dashboard
const RECENT_BLOGS: usize = 5;

#[derive(Debug, Default)]
struct Collections {
    blogs: HashMap<Uuid, Blog>,
    comments: HashMap<Uuid, Comment>,
    moments: HashMap<Uuid, Moment>,
}

/// In-memory content store
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    inner: RwLock<Collections>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut blogs: Vec<Blog>) -> Vec<Blog> {
    blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    blogs
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list_blogs(&self, include_drafts: bool) -> Vec<Blog> {
        let inner = self.inner.read().await;
        newest_first(
            inner
                .blogs
                .values()
                .filter(|b| include_drafts || b.is_published)
                .cloned()
                .collect(),
        )
    }

    async fn get_blog(&self, id: Uuid) -> Result<Blog, ContentError> {
        self.inner
            .read()
            .await
            .blogs
            .get(&id)
            .cloned()
            .ok_or(ContentError::NotFound("Blog"))
    }

    async fn blogs_by_author(&self, author: &str) -> Vec<Blog> {
        let inner = self.inner.read().await;
        newest_first(
            inner
                .blogs
                .values()
                .filter(|b| b.author == author)
                .cloned()
                .collect(),
        )
    }

    async fn add_blog(&self, blog: NewBlog, author: &str, author_name: &str) -> Blog {
        let record = Blog {
            id: Uuid::new_v4(),
            title: blog.title.trim().to_string(),
            sub_title: blog.sub_title.trim().to_string(),
            description: blog.description,
            category: blog.category.trim().to_string(),
            image: blog.image.filter(|url| !url.trim().is_empty()),
            is_published: blog.is_published,
            author: author.to_string(),
            author_name: author_name.to_string(),
            created_at: Utc::now(),
        };

        self.inner
            .write()
            .await
            .blogs
            .insert(record.id, record.clone());
        record
    }

    async fn delete_blog(&self, id: Uuid) -> Result<Blog, ContentError> {
        let mut inner = self.inner.write().await;
        let blog = inner.blogs.remove(&id).ok_or(ContentError::NotFound("Blog"))?;
        inner.comments.retain(|_, c| c.blog_id != id);
        Ok(blog)
    }

    async fn toggle_publish(&self, id: Uuid) -> Result<Blog, ContentError> {
        let mut inner = self.inner.write().await;
        let blog = inner
            .blogs
            .get_mut(&id)
            .ok_or(ContentError::NotFound("Blog"))?;
        blog.is_published = !blog.is_published;
        Ok(blog.clone())
    }

    async fn add_comment(&self, comment: NewComment) -> Result<Comment, ContentError> {
        if comment.name.trim().is_empty() || comment.content.trim().is_empty() {
            return Err(ContentError::Validation(
                "Name and content are required".to_string(),
            ));
        }

        let mut inner = self.inner.write().await;
        if !inner.blogs.contains_key(&comment.blog) {
            return Err(ContentError::NotFound("Blog"));
        }

        let record = Comment {
            id: Uuid::new_v4(),
            blog_id: comment.blog,
            name: comment.name.trim().to_string(),
            content: comment.content,
            is_approved: false,
            created_at: Utc::now(),
        };
        inner.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn approved_comments(&self, blog_id: Uuid) -> Vec<Comment> {
        let inner = self.inner.read().await;
        let mut comments: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.blog_id == blog_id && c.is_approved)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    async fn all_comments(&self) -> Vec<Comment> {
        let inner = self.inner.read().await;
        let mut comments: Vec<Comment> = inner.comments.values().cloned().collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    async fn approve_comment(&self, id: Uuid) -> Result<Comment, ContentError> {
        let mut inner = self.inner.write().await;
        let comment = inner
            .comments
            .get_mut(&id)
            .ok_or(ContentError::NotFound("Comment"))?;
        comment.is_approved = true;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), ContentError> {
        self.inner
            .write()
            .await
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(ContentError::NotFound("Comment"))
    }

    async fn dashboard(&self) -> Dashboard {
        let inner = self.inner.read().await;
        let all = newest_first(inner.blogs.values().cloned().collect());

        Dashboard {
            blogs: all.len(),
            comments: inner.comments.len(),
            drafts: all.iter().filter(|b| !b.is_published).count(),
            recent_blogs: all.into_iter().take(RECENT_BLOGS).collect(),
        }
    }

    async fn list_moments(&self) -> Vec<Moment> {
        let inner = self.inner.read().await;
        let mut moments: Vec<Moment> = inner.moments.values().cloned().collect();
        moments.sort_by(|a, b| b.date.cmp(&a.date));
        moments
    }

    async fn add_moment(&self, moment: NewMoment, created_by: &str) -> Moment {
        let record = Moment {
            id: Uuid::new_v4(),
            title: moment.title.trim().to_string(),
            description: moment.description,
            image: moment.image,
            date: moment.date,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        self.inner
            .write()
            .await
            .moments
            .insert(record.id, record.clone());
        record
    }

    async fn delete_moment(&self, id: Uuid) -> Result<(), ContentError> {
        self.inner
            .write()
            .await
            .moments
            .remove(&id)
            .map(|_| ())
            .ok_or(ContentError::NotFound("Moment"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_blog(title: &str, published: bool) -> NewBlog {
        NewBlog {
            title: title.to_string(),
            sub_title: "sub".to_string(),
            description: "body".to_string(),
            category: "Tech".to_string(),
            image: None,
            is_published: published,
        }
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public_listing() {
        let store = MemoryContentStore::new();
        store.add_blog(new_blog("Live", true), "a@site.com", "A").await;
        store.add_blog(new_blog("Draft", false), "a@site.com", "A").await;

        assert_eq!(store.list_blogs(false).await.len(), 1);
        assert_eq!(store.list_blogs(true).await.len(), 2);

        let dashboard = store.dashboard().await;
        assert_eq!(dashboard.blogs, 2);
        assert_eq!(dashboard.drafts, 1);
    }

    #[tokio::test]
    async fn test_toggle_publish() {
        let store = MemoryContentStore::new();
        let blog = store.add_blog(new_blog("Post", false), "a@site.com", "A").await;

        assert!(store.toggle_publish(blog.id).await.unwrap().is_published);
        assert!(!store.toggle_publish(blog.id).await.unwrap().is_published);
        assert!(matches!(
            store.toggle_publish(Uuid::new_v4()).await,
            Err(ContentError::NotFound("Blog"))
        ));
    }

    #[tokio::test]
    async fn test_comment_moderation() {
        let store = MemoryContentStore::new();
        let blog = store.add_blog(new_blog("Post", true), "a@site.com", "A").await;

        let comment = store
            .add_comment(NewComment {
                blog: blog.id,
                name: "Reader".to_string(),
                content: "Nice".to_string(),
            })
            .await
            .unwrap();
        assert!(store.approved_comments(blog.id).await.is_empty());

        store.approve_comment(comment.id).await.unwrap();
        assert_eq!(store.approved_comments(blog.id).await.len(), 1);

        store.delete_blog(blog.id).await.unwrap();
        assert!(store.all_comments().await.is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_missing_blog() {
        let store = MemoryContentStore::new();
        let result = store
            .add_comment(NewComment {
                blog: Uuid::new_v4(),
                name: "Reader".to_string(),
                content: "Hello".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ContentError::NotFound("Blog"))));
    }

    #[tokio::test]
    async fn test_moments_sorted_by_date() {
        let store = MemoryContentStore::new();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for (title, offset) in [("old", 0), ("new", 2), ("mid", 1)] {
            store
                .add_moment(
                    NewMoment {
                        title: title.to_string(),
                        description: "d".to_string(),
                        image: "https://img.example/x.webp".to_string(),
                        date: base + Duration::days(offset),
                    },
                    "admin@site.com",
                )
                .await;
        }

        let titles: Vec<String> = store
            .list_moments()
            .await
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, ["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_delete_missing_moment() {
        let store = MemoryContentStore::new();
        assert!(matches!(
            store.delete_moment(Uuid::new_v4()).await,
            Err(ContentError::NotFound("Moment"))
        ));
    }
}
