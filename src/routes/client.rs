use actix_web::{post, get, put, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use validator::Validate;

use crate::errors::ServiceError;
use crate::middleware::{guards, AuthUser};
use crate::models::dto::{OfferCreateRequest, OfferResponse, OfferUpdateRequest};
use crate::models::offers;
use crate::services::offer_service::OfferService;

/// POST /api/offers - Créer une offre (client approuvé seulement)
#[post("")]
pub async fn create_offer(
    auth_user: AuthUser,
    body: web::Json<OfferCreateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let client = guards::require_approved_account(db.get_ref(), &auth_user).await?;

    if let Err(errors) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let offer = OfferService::create_offer(db.get_ref(), &client, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(OfferResponse::from(offer)))
}

/// GET /api/offers/my - Mes offres (tout utilisateur vérifié)
#[get("/my")]
pub async fn get_my_offers(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let user = guards::require_user(db.get_ref(), &auth_user).await?;

    let offer_rows = offers::Entity::find()
        .filter(offers::Column::ClientId.eq(user.id))
        .order_by_desc(offers::Column::CreatedAt)
        .all(db.get_ref())
        .await?;

    let response: Vec<OfferResponse> = offer_rows.into_iter().map(OfferResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/offers/{offer_id} - Détail d'une offre (propriétaire seulement)
#[get("/{offer_id}")]
pub async fn get_offer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let user = guards::require_user(db.get_ref(), &auth_user).await?;
    let offer_id = path.into_inner();

    let offer = offers::Entity::find_by_id(offer_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;

    if offer.client_id != user.id {
        return Err(ServiceError::Forbidden(
            "Not authorized to view this offer".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(OfferResponse::from(offer)))
}

/// PUT /api/offers/{offer_id} - Modifier une offre pending (client approuvé)
#[put("/{offer_id}")]
pub async fn update_offer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<OfferUpdateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ServiceError> {
    let client = guards::require_approved_account(db.get_ref(), &auth_user).await?;

    let offer = OfferService::update_offer(
        db.get_ref(),
        client.id,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(OfferResponse::from(offer)))
}

pub fn client_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/offers")
            .service(create_offer)
            .service(get_my_offers)
            .service(get_offer)
            .service(update_offer),
    );
}
