//! Blog, comment and moment records and their request bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ContentError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub sub_title: String,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_published: bool,
    /// Subject (email) of the account that created the post
    pub author: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewBlog {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Image URL; uploads are handled outside this service
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl NewBlog {
    /// Reject posts with any blank required field, naming all of them
    pub fn validate(&self) -> Result<(), ContentError> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("sub_title", &self.sub_title),
            ("description", &self.description),
            ("category", &self.category),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ContentError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub name: String,
    pub content: String,
    /// Hidden from readers until an admin approves it
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub blog: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Moment {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub date: DateTime<Utc>,
    /// Subject (email) of the admin that posted it
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMoment {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub date: DateTime<Utc>,
}

impl NewMoment {
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(ContentError::Validation(
                "Please provide all required fields".to_string(),
            ));
        }
        if self.image.trim().is_empty() {
            return Err(ContentError::Validation("Please provide an image".to_string()));
        }
        Ok(())
    }
}

/// Admin dashboard summary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub blogs: usize,
    pub comments: usize,
    pub drafts: usize,
    pub recent_blogs: Vec<Blog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_blog_validation_names_every_blank_field() {
        let blog = NewBlog {
            title: "Hello".to_string(),
            description: "  ".to_string(),
            ..NewBlog::default()
        };
        let err = blog.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: sub_title, description, category"
        );
    }

    #[test]
    fn test_new_moment_validation() {
        let moment = NewMoment {
            title: "Sunset".to_string(),
            description: "At the pier".to_string(),
            image: String::new(),
            date: Utc::now(),
        };
        assert!(moment.validate().is_err());
    }
}
