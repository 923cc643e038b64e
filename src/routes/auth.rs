use actix_web::{post, get, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::errors::ServiceError;
use crate::middleware::{guards, AuthUser};
use crate::models::dto::{LoginRequest, SignupRequest, TokenResponse, UserResponse};
use crate::services::user_service::UserService;

#[derive(Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

/// POST /api/signup - Créer un compte (PUBLIC)
#[post("/signup")]
pub async fn signup(
    body: web::Json<SignupRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    if let Err(errors) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    UserService::signup(db.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User created. Please check your email to verify your account."
    })))
}

/// GET /api/verify-email?token=xxx - Consommer un token de vérification (PUBLIC)
#[get("/verify-email")]
pub async fn verify_email(
    query: web::Query<VerifyEmailQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    UserService::verify_email(db.get_ref(), &query.token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Email verified successfully. You can now login."
    })))
}

/// POST /api/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let (token, _user) = UserService::login(db.get_ref(), &body.email, &body.password).await?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /api/me - Profil de l'utilisateur courant (PROTÉGÉE)
#[get("/me")]
pub async fn me(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let user = guards::require_user(db.get_ref(), &auth_user).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(signup)
        .service(verify_email)
        .service(login)
        .service(me);
}
