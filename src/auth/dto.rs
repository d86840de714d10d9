use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;
use crate::session::PageContext;

/// Form body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub csrf_token: Option<String>,
}

/// Form body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub csrf_token: Option<String>,
}

/// Form body for changing the password of the logged-in user.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordUpdateForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
    pub csrf_token: Option<String>,
}

/// Logout carries nothing but the CSRF token.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogoutForm {
    pub csrf_token: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SignupValues {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, Serialize)]
pub struct LoginValues {
    pub email: String,
}

/// Every field of the password form is a secret.
#[derive(Debug, Default, Serialize)]
pub struct PasswordValues {}

impl SignupForm {
    pub fn values(&self) -> SignupValues {
        SignupValues {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl LoginForm {
    pub fn values(&self) -> LoginValues {
        LoginValues {
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountPage {
    pub page: PageContext,
    pub user: User,
}
