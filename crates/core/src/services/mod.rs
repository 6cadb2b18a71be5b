//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod following;
pub mod group;
pub mod media;
pub mod post;
pub mod user;

pub use comment::{CommentService, CommentWithAuthor, CreateCommentInput};
pub use following::{FollowResult, FollowingService};
pub use group::{CreateGroupInput, GroupService};
pub use media::ImageUpload;
pub use post::{
    CreatePostInput, ImageChange, PostService, PostWithRelations, PublishedWithin,
    UpdatePostInput,
};
pub use user::{SignupInput, UserService};
