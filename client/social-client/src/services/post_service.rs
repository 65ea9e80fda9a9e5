use social_common::models::{Comment, CreateCommentRequest, CreatePostRequest, LikeRequest, LikeType, MessageResponse};
use social_common::{ApiClient, Post, ServiceError};
use tracing::{debug, info};

use crate::error::ClientResult;

#[derive(Clone)]
pub struct PostService {
    api: ApiClient,
}

impl PostService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Posts visible to the viewer, newest first
    pub async fn feed(&self) -> ClientResult<Vec<Post>> {
        let posts = self.api.get::<Vec<Post>>("/posts").await?.unwrap_or_default();
        debug!(count = posts.len(), "Loaded feed");
        Ok(posts)
    }

    pub async fn create_post(&self, request: &CreatePostRequest) -> ClientResult<Post> {
        let post = self
            .api
            .post::<_, Post>("/posts", Some(request))
            .await?
            .ok_or_else(|| ServiceError::ExternalService("empty create post response".into()))?;
        info!(post_id = post.id, privacy = ?post.privacy, "Post created");
        Ok(post)
    }

    pub async fn create_comment(&self, post_id: i64, request: &CreateCommentRequest) -> ClientResult<Comment> {
        let comment = self
            .api
            .post::<_, Comment>(&format!("/posts/{post_id}/comments"), Some(request))
            .await?
            .ok_or_else(|| ServiceError::ExternalService("empty create comment response".into()))?;
        info!(post_id, comment_id = comment.id, "Comment created");
        Ok(comment)
    }

    /// Like, dislike, or clear the viewer's vote on a post
    pub async fn like_post(&self, post_id: i64, like: LikeType) -> ClientResult<()> {
        let body = LikeRequest::from(like);
        self.api
            .post::<_, MessageResponse>(&format!("/posts/{post_id}/like"), Some(&body))
            .await?;
        debug!(post_id, like_type = body.like_type, "Vote recorded");
        Ok(())
    }
}
