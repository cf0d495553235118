use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A student registration as submitted by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIn {
    pub firstname: String,
    pub lastname: String,
    pub mothername: Option<String>,
    pub fathername: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i32,
    pub firstname: String,
    pub lastname: String,
    pub mothername: Option<String>,
    pub fathername: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}
