// Taxonomie d'erreurs du backend. Chaque variante correspond à un code HTTP;
// les routes renvoient Result<HttpResponse, ServiceError> et propagent avec `?`.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// L'entité référencée (user/driver/offer/token) n'existe pas
    #[error("{0}")]
    NotFound(String),

    /// Identité non établie (credentials ou token invalides)
    #[error("{0}")]
    Unauthorized(String),

    /// Identité établie mais action refusée (gate d'approbation, rôle, ownership)
    #[error("{0}")]
    Forbidden(String),

    /// Garde de la machine à états violée, doublon, auto-approbation
    #[error("{0}")]
    Conflict(String),

    /// Valeur de filtre ou de statut mal formée
    #[error("{0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Défaillance interne non imputable à l'appelant
    #[error("{0}")]
    Internal(String),
}

impl actix_web::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}
