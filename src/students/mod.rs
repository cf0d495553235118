use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::{error, info};

use crate::db::{StudentIn, StudentStore};
use crate::error::{AppError, DatabaseError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub message: &'static str,
}

fn store(state: &AppState) -> Result<&Arc<dyn StudentStore>, AppError> {
    state
        .students
        .as_ref()
        .ok_or(AppError::DatabaseError(DatabaseError::NotConfigured))
}

/// `POST /students`
pub async fn create_student(
    req: web::Json<StudentIn>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let store = store(&state)?;
    info!("Registering student {} {}", req.firstname, req.lastname);

    store.create_student(&req).await.map_err(|e| {
        error!("Student registration failed: {}", e);
        AppError::from(e)
    })?;

    Ok(HttpResponse::Created().json(Acknowledgement {
        message: "Student registration successful",
    }))
}

/// `GET /students`
pub async fn list_students(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let students = store(&state)?.list_students().await?;
    Ok(HttpResponse::Ok().json(students))
}
