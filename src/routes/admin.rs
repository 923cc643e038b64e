use actix_web::{get, put, delete, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::middleware::{guards, AuthUser};
use crate::models::dto::{
    AdminAssignRequest, ApprovalRequest, DriverResponse, OfferResponse, OfferUpdateRequest,
    UserResponse, UserUpdate,
};
use crate::models::enums::ApprovalStatus;
use crate::models::{drivers, offers, users};
use crate::services::driver_service::DriverService;
use crate::services::offer_service::OfferService;
use crate::services::report_service::ReportService;
use crate::services::user_service::UserService;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
}

// ===== USERS =====

/// GET /api/admin/users - Tous les comptes
#[get("/users")]
pub async fn get_all_users(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let user_rows = users::Entity::find()
        .order_by_asc(users::Column::Id)
        .all(db.get_ref())
        .await?;

    let response: Vec<UserResponse> = user_rows.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/admin/users/pending - File d'attente d'approbation des comptes
#[get("/users/pending")]
pub async fn get_pending_users(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let user_rows = users::Entity::find()
        .filter(users::Column::AccountStatus.eq(ApprovalStatus::Pending))
        .order_by_asc(users::Column::CreatedAt)
        .all(db.get_ref())
        .await?;

    let response: Vec<UserResponse> = user_rows.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /api/admin/users/{user_id} - Modifier un compte (patch partiel)
#[put("/users/{user_id}")]
pub async fn update_user(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UserUpdate>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let user = UserService::update_user(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/admin/users/{user_id}/approval - Décision d'approbation de compte
#[put("/users/{user_id}/approval")]
pub async fn approve_user(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ApprovalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let admin = guards::require_admin(db.get_ref(), &auth_user).await?;

    let user =
        UserService::set_approval(db.get_ref(), &admin, path.into_inner(), body.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /api/admin/users/{user_id} - Supprimer un compte (jamais le sien)
#[delete("/users/{user_id}")]
pub async fn delete_user(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let admin = guards::require_admin(db.get_ref(), &auth_user).await?;

    UserService::delete_user(db.get_ref(), &admin, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User deleted successfully"
    })))
}

// ===== DRIVERS =====

/// GET /api/admin/drivers - Tous les profils drivers
#[get("/drivers")]
pub async fn get_all_drivers(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let driver_rows = drivers::Entity::find()
        .order_by_asc(drivers::Column::Id)
        .all(db.get_ref())
        .await?;

    let response: Vec<DriverResponse> =
        driver_rows.into_iter().map(DriverResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/admin/drivers/pending - File d'attente d'approbation des drivers
#[get("/drivers/pending")]
pub async fn get_pending_drivers(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let driver_rows = drivers::Entity::find()
        .filter(drivers::Column::DriverStatus.eq(ApprovalStatus::Pending))
        .order_by_asc(drivers::Column::CreatedAt)
        .all(db.get_ref())
        .await?;

    let response: Vec<DriverResponse> =
        driver_rows.into_iter().map(DriverResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /api/admin/drivers/{driver_id}/approval - Décision d'approbation driver
#[put("/drivers/{driver_id}/approval")]
pub async fn approve_driver(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ApprovalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let admin = guards::require_admin(db.get_ref(), &auth_user).await?;

    let driver =
        DriverService::set_approval(db.get_ref(), &admin, path.into_inner(), body.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(DriverResponse::from(driver)))
}

// ===== OFFERS =====

/// GET /api/admin/offers - Toutes les offres
#[get("/offers")]
pub async fn get_all_offers(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let offer_rows = offers::Entity::find()
        .order_by_desc(offers::Column::CreatedAt)
        .all(db.get_ref())
        .await?;

    let response: Vec<OfferResponse> = offer_rows.into_iter().map(OfferResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /api/admin/offers/{offer_id} - Modifier une offre pending
#[put("/offers/{offer_id}")]
pub async fn admin_update_offer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<OfferUpdateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let offer =
        OfferService::admin_update_offer(db.get_ref(), path.into_inner(), body.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(OfferResponse::from(offer)))
}

/// PUT /api/admin/offers/{offer_id}/assign/{driver_id} - Assignation par id
#[put("/offers/{offer_id}/assign/{driver_id}")]
pub async fn assign_driver(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    body: web::Json<AdminAssignRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;
    let (offer_id, driver_id) = path.into_inner();

    let offer =
        OfferService::admin_assign_driver(db.get_ref(), offer_id, driver_id, body.status.clone())
            .await?;
    Ok(HttpResponse::Ok().json(OfferResponse::from(offer)))
}

// ===== REPORTS =====

/// GET /api/admin/reports/trips?start_date&end_date&status - Rapport agrégé
#[get("/reports/trips")]
pub async fn trips_report(
    auth_user: AuthUser,
    query: web::Query<ReportQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    guards::require_admin(db.get_ref(), &auth_user).await?;

    let report = ReportService::trips_report(
        db.get_ref(),
        query.start_date.clone(),
        query.end_date.clone(),
        query.status.clone(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(report))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(get_all_users)
            .service(get_pending_users)
            .service(approve_user)
            .service(update_user)
            .service(delete_user)
            .service(get_all_drivers)
            .service(get_pending_drivers)
            .service(approve_driver)
            .service(get_all_offers)
            .service(assign_driver)
            .service(admin_update_offer)
            .service(trips_report),
    );
}
