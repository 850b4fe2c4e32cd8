use actix_web::{post, web, HttpResponse, Responder};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use log::error;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Single-admin login. No session token is issued; the frontend only
/// needs the success flag to unlock its views.
#[post("/api/login")]
async fn login(
    app_state: web::Data<AppState>,
    credentials: web::Json<LoginRequest>,
) -> impl Responder {
    let hash_result = sqlx::query_scalar::<_, String>(
        "SELECT password_hash FROM users WHERE username = ?"
    )
    .bind(&credentials.username)
    .fetch_optional(&app_state.db)
    .await;

    let stored_hash = match hash_result {
        Ok(Some(hash)) => hash,
        Ok(None) => {
            return HttpResponse::Unauthorized().json(LoginResponse {
                success: false,
                message: "Invalid username or password".to_string(),
            });
        }
        Err(e) => {
            error!("Database error during login: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Error during login".to_string(),
            });
        }
    };

    let parsed_hash = match PasswordHash::new(&stored_hash) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to parse stored password hash: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Error during login".to_string(),
            });
        }
    };

    let password_valid = Argon2::default()
        .verify_password(credentials.password.as_bytes(), &parsed_hash)
        .is_ok();

    if password_valid {
        HttpResponse::Ok().json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
        })
    } else {
        HttpResponse::Unauthorized().json(LoginResponse {
            success: false,
            message: "Invalid username or password".to_string(),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login);
}
