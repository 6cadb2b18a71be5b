//! HTML forms.
//!
//! Each form is the raw submission. `clean` turns it into the typed input
//! of a service call, or into [`FormErrors`] the page renders next to the
//! offending fields.

use axum::extract::Multipart;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};
use yatube_common::{AppError, AppResult};
use yatube_core::{
    CreateCommentInput, CreateGroupInput, CreatePostInput, ImageChange, ImageUpload,
    SignupInput, UpdatePostInput,
    group::validate_slug,
    post::validate_not_blank,
    user::validate_username,
};
use yatube_db::entities::group;

use crate::csrf::CSRF_FIELD;

/// Field name of errors that belong to the form as a whole.
pub const NON_FIELD: &str = "__all__";

/// One validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Validation messages of a submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    /// No errors.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Record a message about the whole form.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD, message);
    }

    /// Single-message error set.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    /// Messages for one field.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Messages about the whole form.
    #[must_use]
    pub fn non_field(&self) -> Vec<&str> {
        self.for_field(NON_FIELD)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Self::new();
        for (field, errs) in fields {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map_or_else(|| default_message(err), ToString::to_string);
                out.add(&field, message);
            }
        }
        out
    }
}

fn default_message(err: &ValidationError) -> String {
    match err.code.as_ref() {
        "email" => "Enter a valid email address.".to_string(),
        "length" => {
            let len = err
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|s| s.chars().count() as u64);
            let min = err.params.get("min").and_then(|v| v.as_u64());
            let max = err.params.get("max").and_then(|v| v.as_u64());
            match (len, min, max) {
                (Some(0), Some(_), _) => REQUIRED.to_string(),
                (Some(len), Some(min), _) if len < min => {
                    format!("Ensure this value has at least {min} characters.")
                }
                (_, _, Some(max)) => format!("Ensure this value has at most {max} characters."),
                (_, Some(min), None) => format!("Ensure this value has at least {min} characters."),
                _ => "Enter a valid value.".to_string(),
            }
        }
        _ => "Enter a valid value.".to_string(),
    }
}

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Check a selected group ID against the offered groups. Blank means none.
fn clean_group(
    selected: &str,
    groups: &[group::Model],
    errors: &mut FormErrors,
) -> Option<String> {
    let selected = selected.trim();
    if selected.is_empty() {
        return None;
    }
    if groups.iter().any(|g| g.id == selected) {
        Some(selected.to_string())
    } else {
        errors.add("group", INVALID_CHOICE);
        None
    }
}

/// Create/edit post form, submitted as `multipart/form-data`.
#[derive(Debug, Clone, Default, Validate)]
pub struct PostForm {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    pub group: String,
    pub image: Option<ImageUpload>,
    pub image_clear: bool,
    pub csrf_token: String,
}

impl PostForm {
    /// Label of the text field.
    pub const TEXT_LABEL: &'static str = "Post text";
    /// Label of the group field.
    pub const GROUP_LABEL: &'static str = "Post group";
    /// Label of the image field.
    pub const IMAGE_LABEL: &'static str = "Post image";
    /// Help text of the text field.
    pub const TEXT_HELP: &'static str = "Enter the text of the post";
    /// Help text of the group field.
    pub const GROUP_HELP: &'static str = "Group this post belongs to";

    /// Read the form from a multipart body.
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or("").to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    // Browsers send an empty part when no file was chosen
                    if !(file_name.is_empty() && data.is_empty()) {
                        form.image = Some(ImageUpload::new(file_name, data.to_vec()));
                    }
                }
                "text" | "group" | "image-clear" | CSRF_FIELD => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    match name.as_str() {
                        "text" => form.text = value,
                        "group" => form.group = value,
                        "image-clear" => form.image_clear = !value.is_empty(),
                        _ => form.csrf_token = value,
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn check(&self, groups: &[group::Model]) -> (FormErrors, Option<String>) {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(&e),
        };
        let group_id = clean_group(&self.group, groups, &mut errors);
        if let Some(upload) = &self.image
            && let Err(e) = upload.format()
        {
            errors.add("image", validation_message(e));
        }
        (errors, group_id)
    }

    /// Input for publishing a new post.
    pub fn clean_create(&self, groups: &[group::Model]) -> Result<CreatePostInput, FormErrors> {
        let (errors, group_id) = self.check(groups);
        errors.into_result()?;
        Ok(CreatePostInput {
            text: self.text.clone(),
            group_id,
            image: self.image.clone(),
        })
    }

    /// Input for editing a post. An omitted image keeps the current one.
    pub fn clean_update(&self, groups: &[group::Model]) -> Result<UpdatePostInput, FormErrors> {
        let (mut errors, group_id) = self.check(groups);
        let image = match (&self.image, self.image_clear) {
            (Some(_), true) => {
                errors.add(
                    "image",
                    "Please either submit a file or check the clear checkbox, not both.",
                );
                ImageChange::Keep
            }
            (Some(upload), false) => ImageChange::Replace(upload.clone()),
            (None, true) => ImageChange::Clear,
            (None, false) => ImageChange::Keep,
        };
        errors.into_result()?;
        Ok(UpdatePostInput {
            text: self.text.clone(),
            group_id,
            image,
        })
    }
}

fn validation_message(err: AppError) -> String {
    match err {
        AppError::Validation(message) => message,
        other => other.to_string(),
    }
}

/// Comment form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
}

impl CommentForm {
    /// Label of the text field.
    pub const TEXT_LABEL: &'static str = "Enter comment text";

    pub fn clean(&self) -> Result<CreateCommentInput, FormErrors> {
        self.validate().map_err(|e| FormErrors::from(&e))?;
        Ok(CreateCommentInput {
            text: self.text.clone(),
        })
    }
}

/// Signup form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SignupForm {
    #[validate(length(max = 150))]
    pub first_name: String,

    #[validate(length(max = 150))]
    pub last_name: String,

    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password1: String,

    pub password2: String,
}

impl SignupForm {
    pub fn clean(&self) -> Result<SignupInput, FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(&e),
        };
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors.into_result()?;

        Ok(SignupInput {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password1.clone(),
        })
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(&str, &str), FormErrors> {
        let mut errors = FormErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result()?;
        Ok((self.username.trim(), &self.password))
    }
}

/// Group creation form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct GroupForm {
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub title: String,

    #[validate(custom(function = "validate_slug"), length(max = 50))]
    pub slug: String,

    pub description: String,
}

impl GroupForm {
    pub fn clean(&self) -> Result<CreateGroupInput, FormErrors> {
        self.validate().map_err(|e| FormErrors::from(&e))?;
        Ok(CreateGroupInput {
            title: self.title.trim().to_string(),
            slug: self.slug.trim().to_string(),
            description: self.description.clone(),
        })
    }
}

/// Moderation form that moves a post to another group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupChoiceForm {
    pub group: String,
}

impl GroupChoiceForm {
    /// Selected group ID, `None` for no group.
    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        Some(self.group.trim()).filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn cats() -> group::Model {
        group::Model {
            id: "01group".to_string(),
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        }
    }

    fn post_form(text: &str, group: &str) -> PostForm {
        PostForm {
            text: text.to_string(),
            group: group.to_string(),
            ..PostForm::default()
        }
    }

    #[test]
    fn test_post_form_requires_text() {
        let errors = post_form("   ", "").clean_create(&[]).unwrap_err();
        assert_eq!(errors.for_field("text"), vec!["This field is required."]);
    }

    #[test]
    fn test_post_form_group_is_optional() {
        let input = post_form("Hello", "").clean_create(&[cats()]).unwrap();
        assert_eq!(input.group_id, None);

        let input = post_form("Hello", "01group").clean_create(&[cats()]).unwrap();
        assert_eq!(input.group_id.as_deref(), Some("01group"));
    }

    #[test]
    fn test_post_form_rejects_unknown_group() {
        let errors = post_form("Hello", "nope").clean_create(&[cats()]).unwrap_err();
        assert_eq!(errors.for_field("group"), vec![INVALID_CHOICE]);
    }

    #[test]
    fn test_post_form_rejects_non_image() {
        let mut form = post_form("Hello", "");
        form.image = Some(ImageUpload::new("notes.txt", b"plain text".to_vec()));

        let errors = form.clean_create(&[]).unwrap_err();
        assert_eq!(errors.for_field("image").len(), 1);
    }

    #[test]
    fn test_post_form_image_changes() {
        let mut form = post_form("Hello", "");
        assert_eq!(form.clean_update(&[]).unwrap().image, ImageChange::Keep);

        form.image_clear = true;
        assert_eq!(form.clean_update(&[]).unwrap().image, ImageChange::Clear);

        form.image = Some(ImageUpload::new("small.gif", SMALL_GIF.to_vec()));
        assert!(form.clean_update(&[]).is_err());

        form.image_clear = false;
        assert!(matches!(
            form.clean_update(&[]).unwrap().image,
            ImageChange::Replace(_)
        ));
    }

    #[test]
    fn test_comment_form() {
        let form = CommentForm {
            text: "Nice post".to_string(),
        };
        assert_eq!(form.clean().unwrap().text, "Nice post");

        let blank = CommentForm::default();
        assert!(blank.clean().unwrap_err().has_errors());
    }

    #[test]
    fn test_signup_form_password_mismatch() {
        let form = SignupForm {
            username: "leo".to_string(),
            email: "leo@example.com".to_string(),
            password1: "war-and-peace".to_string(),
            password2: "anna-karenina".to_string(),
            ..SignupForm::default()
        };

        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors.for_field("password2"),
            vec!["The two password fields didn't match."]
        );
    }

    #[test]
    fn test_signup_form_field_errors() {
        let form = SignupForm {
            username: "leo tolstoy".to_string(),
            email: "not-an-email".to_string(),
            password1: "short".to_string(),
            password2: "short".to_string(),
            ..SignupForm::default()
        };

        let errors = form.clean().unwrap_err();
        assert_eq!(errors.for_field("username").len(), 1);
        assert_eq!(errors.for_field("email"), vec!["Enter a valid email address."]);
        assert_eq!(
            errors.for_field("password1"),
            vec!["Ensure this value has at least 8 characters."]
        );
    }

    #[test]
    fn test_login_form_requires_both_fields() {
        let errors = LoginForm::default().clean().unwrap_err();
        assert_eq!(errors.for_field("username").len(), 1);
        assert_eq!(errors.for_field("password").len(), 1);
    }

    #[test]
    fn test_group_form_slug() {
        let form = GroupForm {
            title: "Cats".to_string(),
            slug: "cats and dogs".to_string(),
            description: String::new(),
        };
        assert_eq!(form.clean().unwrap_err().for_field("slug").len(), 1);
    }

    #[test]
    fn test_group_choice() {
        assert_eq!(GroupChoiceForm::default().group_id(), None);
        let form = GroupChoiceForm {
            group: "01group".to_string(),
        };
        assert_eq!(form.group_id(), Some("01group"));
    }
}
