use serde::{Deserialize, Serialize};

/// A stored account row. The password digest never leaves the store layer
/// except for verification during login.
#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i64>,
    pub country: Option<String>,
    pub created_at: String,
}

/// Fields a profile update may change. `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub country: Option<String>,
}

/// The shape of a user in API responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i64>,
    pub country: Option<String>,
    pub joined_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            age: user.age,
            country: user.country.clone(),
            joined_at: user.created_at.clone(),
        }
    }
}
