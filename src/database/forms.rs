use std::collections::HashSet;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::constants::{
    EMAIL_MAX_LENGTH, NAME_MAX_LENGTH, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH,
    RECIPE_NAME_MAX_LENGTH, RESERVED_USERNAMES, USERNAME_MAX_LENGTH,
};
use crate::error::Error;

use super::error::TypeError;
use super::schema::Id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Field-level validation failures, accumulated over a whole form so the
/// caller sees every broken constraint at once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Into<Error> for ValidationErrors {
    fn into(self) -> Error {
        let info = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<String>>()
            .join("; ");
        Error::new(400, Some(info))
    }
}

fn is_valid_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn check_password(field: &str, value: &str, errors: &mut ValidationErrors) {
    if value.len() < PASSWORD_MIN_LENGTH || value.len() > PASSWORD_MAX_LENGTH {
        errors.push(field, "Password must be 8 to 128 characters long");
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.username.is_empty() || self.username.len() > USERNAME_MAX_LENGTH {
            errors.push("username", "Username must be 1 to 150 characters long");
        }
        if !self.username.chars().all(is_valid_username_char) {
            errors.push("username", "Username contains invalid characters");
        }
        if RESERVED_USERNAMES.contains(&self.username.to_lowercase().as_str()) {
            errors.push("username", "This username is reserved");
        }
        if self.email.len() > EMAIL_MAX_LENGTH || !is_plausible_email(&self.email) {
            errors.push("email", "Invalid email address");
        }
        if self.first_name.is_empty() || self.first_name.len() > NAME_MAX_LENGTH {
            errors.push("first_name", "First name must be 1 to 150 characters long");
        }
        if self.last_name.is_empty() || self.last_name.len() > NAME_MAX_LENGTH {
            errors.push("last_name", "Last name must be 1 to 150 characters long");
        }
        check_password("password", &self.password, &mut errors);

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordForm {
    pub current_password: String,
    pub new_password: String,
}

impl SetPasswordForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_password("new_password", &self.new_password, &mut errors);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientLineForm {
    pub id: Id,
    pub amount: i32,
}

/// Incoming recipe payload for create and update. `author` is only accepted
/// when it names the authenticated caller; the mutation layer rejects it
/// otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientLineForm>,
    #[serde(default)]
    pub author: Option<uuid::Uuid>,
}

impl RecipeDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.name.is_empty() || self.name.len() > RECIPE_NAME_MAX_LENGTH {
            errors.push("name", "Recipe name must be 1 to 200 characters long");
        }
        if self.image.is_empty() {
            errors.push("image", "An image is required");
        }
        if self.cooking_time < 1 {
            errors.push("cooking_time", "Cooking time must be at least 1");
        }

        if self.tags.is_empty() {
            errors.push("tags", "A recipe requires at least one tag");
        }
        let unique_tags: HashSet<Id> = self.tags.iter().copied().collect();
        if unique_tags.len() != self.tags.len() {
            errors.push("tags", "Tags must not repeat");
        }

        if self.ingredients.is_empty() {
            errors.push("ingredients", "A recipe requires at least one ingredient");
        }
        let unique_ingredients: HashSet<Id> = self.ingredients.iter().map(|i| i.id).collect();
        if unique_ingredients.len() != self.ingredients.len() {
            errors.push("ingredients", "Ingredients must not repeat");
        }
        if self.ingredients.iter().any(|i| i.amount < 1) {
            errors.push("ingredients", "Ingredient amounts must be at least 1");
        }

        errors.into_result()
    }
}

/// Decodes a `data:image/<ext>;base64,<payload>` image into raw bytes and the
/// file extension. Storage of the result is the caller's concern.
pub fn decode_image(data: &str) -> Result<(Vec<u8>, String), TypeError> {
    let rest = data
        .strip_prefix("data:image/")
        .ok_or_else(|| TypeError::new("Expected a data:image payload"))?;
    let (ext, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| TypeError::new("Expected a base64 encoded image"))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| TypeError::new("Invalid base64 image payload"))?;

    Ok((bytes, ext.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_string(),
            image: "data:image/png;base64,aGk=".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
            tags: vec![1],
            ingredients: vec![
                IngredientLineForm { id: 1, amount: 200 },
                IngredientLineForm { id: 2, amount: 50 },
            ],
            author: None,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn empty_tag_set_is_rejected() {
        let mut d = draft();
        d.tags.clear();
        let errors = d.validate().unwrap_err();
        assert!(errors.errors.iter().any(|e| e.field == "tags"));
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut d = draft();
        d.tags = vec![1, 2, 1];
        let errors = d.validate().unwrap_err();
        assert!(errors.errors.iter().any(|e| e.field == "tags"));
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let mut d = draft();
        d.ingredients.clear();
        let errors = d.validate().unwrap_err();
        assert!(errors.errors.iter().any(|e| e.field == "ingredients"));
    }

    #[test]
    fn duplicate_ingredient_ids_are_rejected() {
        let mut d = draft();
        d.ingredients = vec![
            IngredientLineForm { id: 1, amount: 10 },
            IngredientLineForm { id: 1, amount: 5 },
        ];
        let errors = d.validate().unwrap_err();
        assert!(errors.errors.iter().any(|e| e.field == "ingredients"));
    }

    #[test]
    fn zero_cooking_time_is_rejected() {
        let mut d = draft();
        d.cooking_time = 0;
        assert!(d.validate().is_err());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut d = draft();
        d.ingredients[0].amount = 0;
        assert!(d.validate().is_err());
    }

    fn register() -> RegisterForm {
        RegisterForm {
            email: "cook@example.com".to_string(),
            username: "cook_01".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            password: "longenough".to_string(),
        }
    }

    #[test]
    fn reserved_usernames_are_rejected() {
        for name in ["me", "Me", "subscriptions", "set_password"] {
            let mut form = register();
            form.username = name.to_string();
            let errors = form.validate().unwrap_err();
            assert!(errors.errors.iter().any(|e| e.field == "username"), "{name}");
        }
    }

    #[test]
    fn username_charset_is_enforced() {
        let mut form = register();
        form.username = "no spaces!".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        let mut form = register();
        form.password = "short".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn collects_every_failure() {
        let form = RegisterForm {
            email: "broken".to_string(),
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password: "x".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.errors.len() >= 4);
    }

    #[test]
    fn image_decoding() {
        let (bytes, ext) = decode_image("data:image/png;base64,aGk=").unwrap();
        assert_eq!(bytes, b"hi");
        assert_eq!(ext, "png");
        assert!(decode_image("not an image").is_err());
        assert!(decode_image("data:image/png;base64,???").is_err());
    }
}
