use actix_web::{post, get, put, web, HttpResponse};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Deserialize;
use validator::Validate;

use crate::errors::ServiceError;
use crate::middleware::{guards, AuthUser};
use crate::models::dto::{
    DriverCreateRequest, DriverResponse, DriverStatusRequest, DriverUpdate, OfferResponse,
    OfferStatusUpdateRequest,
};
use crate::models::enums::OfferStatus;
use crate::models::{drivers, offers};
use crate::services::driver_service::DriverService;
use crate::services::offer_service::OfferService;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

// ===== GESTION DU PROFIL =====

/// POST /api/driver/profile - Créer son profil (premier setup)
#[post("/profile")]
pub async fn create_profile(
    auth_user: AuthUser,
    body: web::Json<DriverCreateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let user = guards::require_driver_role(db.get_ref(), &auth_user).await?;

    if let Err(errors) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let driver = DriverService::create_profile(db.get_ref(), &user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(DriverResponse::from(driver)))
}

/// GET /api/driver/profile - Son profil (quel que soit le statut d'approbation)
#[get("/profile")]
pub async fn get_profile(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let user = guards::require_driver_role(db.get_ref(), &auth_user).await?;

    let driver = drivers::Entity::find()
        .filter(drivers::Column::UserId.eq(user.id))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound("Driver profile not found. Please create one.".to_string())
        })?;

    Ok(HttpResponse::Ok().json(DriverResponse::from(driver)))
}

/// PUT /api/driver/profile - Modifier son profil (pending/approved seulement)
#[put("/profile")]
pub async fn update_profile(
    auth_user: AuthUser,
    body: web::Json<DriverUpdate>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let user = guards::require_driver_role(db.get_ref(), &auth_user).await?;

    let driver = DriverService::update_profile(db.get_ref(), user.id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DriverResponse::from(driver)))
}

/// PUT /api/driver/status - Changer sa disponibilité (driver approuvé)
#[put("/status")]
pub async fn update_status(
    auth_user: AuthUser,
    body: web::Json<DriverStatusRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;

    let updated = DriverService::set_status(db.get_ref(), &driver, &body.status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Status updated to {}", body.status),
        "status": updated.status
    })))
}

// ===== OFFRES (drivers approuvés seulement) =====

/// GET /api/driver/offers/available - Offres pending non assignées
#[get("/offers/available")]
pub async fn get_available_offers(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_approved_driver(db.get_ref(), &auth_user).await?;

    let offer_rows = offers::Entity::find()
        .filter(offers::Column::Status.eq(OfferStatus::Pending))
        .filter(offers::Column::DriverId.is_null())
        .order_by_desc(offers::Column::CreatedAt)
        .all(db.get_ref())
        .await?;

    let response: Vec<OfferResponse> = offer_rows.into_iter().map(OfferResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/driver/offers/my-assignments - Toutes mes offres assignées
#[get("/offers/my-assignments")]
pub async fn get_my_assignments(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;

    let offer_rows = offers::Entity::find()
        .filter(offers::Column::DriverId.eq(driver.id))
        .order_by_desc(offers::Column::UpdatedAt)
        .all(db.get_ref())
        .await?;

    let response: Vec<OfferResponse> = offer_rows.into_iter().map(OfferResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/driver/offers/active - Mes offres matched ou in_progress
#[get("/offers/active")]
pub async fn get_active_offers(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;

    let offer_rows = offers::Entity::find()
        .filter(offers::Column::DriverId.eq(driver.id))
        .filter(
            offers::Column::Status
                .is_in([OfferStatus::Matched, OfferStatus::InProgress]),
        )
        .all(db.get_ref())
        .await?;

    let response: Vec<OfferResponse> = offer_rows.into_iter().map(OfferResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/driver/offers/{offer_id} - Détail d'une offre
#[get("/offers/{offer_id}")]
pub async fn get_offer_details(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_driver_role(db.get_ref(), &auth_user).await?;

    let offer = offers::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;

    Ok(HttpResponse::Ok().json(OfferResponse::from(offer)))
}

/// POST /api/driver/offers/{offer_id}/accept - Self-accept d'une offre pending
#[post("/offers/{offer_id}/accept")]
pub async fn accept_offer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;
    let offer_id = path.into_inner();

    OfferService::accept_offer(db.get_ref(), &driver, offer_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Offer accepted successfully",
        "offer_id": offer_id
    })))
}

/// PUT /api/driver/offers/{offer_id}/status - Transition de statut
#[put("/offers/{offer_id}/status")]
pub async fn update_offer_status(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<OfferStatusUpdateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;
    let offer_id = path.into_inner();

    let offer = OfferService::update_status(db.get_ref(), &driver, offer_id, &body.status).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Offer status updated to {}", body.status),
        "offer_id": offer_id,
        "new_status": offer.status
    })))
}

// ===== STATISTIQUES & HISTORIQUE =====

/// GET /api/driver/statistics - Compteurs par statut (driver approuvé)
#[get("/statistics")]
pub async fn get_statistics(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;

    let total_assigned = offers::Entity::find()
        .filter(offers::Column::DriverId.eq(driver.id))
        .count(db.get_ref())
        .await?;

    let mut by_status = std::collections::HashMap::new();
    for status in [
        OfferStatus::Matched,
        OfferStatus::InProgress,
        OfferStatus::Completed,
        OfferStatus::Cancelled,
    ] {
        let count = offers::Entity::find()
            .filter(offers::Column::DriverId.eq(driver.id))
            .filter(offers::Column::Status.eq(status.clone()))
            .count(db.get_ref())
            .await?;
        by_status.insert(status, count);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "driver_info": {
            "name": format!("{} {}", driver.first_name, driver.last_name),
            "status": driver.status,
            "driver_status": driver.driver_status,
            "rating": driver.rating,
            "total_deliveries": driver.total_deliveries
        },
        "statistics": {
            "total_assigned": total_assigned,
            "matched": by_status.get(&OfferStatus::Matched),
            "in_progress": by_status.get(&OfferStatus::InProgress),
            "completed": by_status.get(&OfferStatus::Completed),
            "cancelled": by_status.get(&OfferStatus::Cancelled)
        }
    })))
}

/// GET /api/driver/history?limit=50 - Livraisons terminées ou annulées
#[get("/history")]
pub async fn get_history(
    auth_user: AuthUser,
    query: web::Query<HistoryQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let driver = guards::require_approved_driver(db.get_ref(), &auth_user).await?;

    let offer_rows = offers::Entity::find()
        .filter(offers::Column::DriverId.eq(driver.id))
        .filter(
            offers::Column::Status
                .is_in([OfferStatus::Completed, OfferStatus::Cancelled]),
        )
        .order_by_desc(offers::Column::UpdatedAt)
        .limit(query.limit.unwrap_or(50))
        .all(db.get_ref())
        .await?;

    let response: Vec<OfferResponse> = offer_rows.into_iter().map(OfferResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

pub fn driver_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/driver")
            .service(create_profile)
            .service(get_profile)
            .service(update_profile)
            .service(update_status)
            .service(get_available_offers)
            .service(get_my_assignments)
            .service(get_active_offers)
            .service(accept_offer)
            .service(update_offer_status)
            .service(get_offer_details)
            .service(get_statistics)
            .service(get_history),
    );
}
