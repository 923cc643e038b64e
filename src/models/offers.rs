// ============================================================================
// MODÈLE : OFFERS
// ============================================================================
//
// Description:
//   Une demande de livraison créée par un client. Machine à états stricte:
//
//   pending → matched → in_progress → completed
//                  \________\______→ cancelled
//
// Points d'attention:
//   - driver_id est non-null ssi status ∈ {matched, in_progress, completed}
//     (cancelled peut garder le driver_id d'avant l'annulation)
//   - Les champs driver_first_name / driver_phone / vehicle_* sont un
//     SNAPSHOT copié au moment de l'assignation (via DriverSnapshot),
//     jamais resynchronisé si le profil driver change ensuite
//   - Les champs éditables côté client ne sont modifiables que tant que
//     status = pending
//   - updated_at est rafraîchi à chaque mutation
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::OfferStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offers_rust")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub client_id: i32,
    pub driver_id: Option<i32>,

    pub company_representative: String,
    pub emergency_phone: String,
    pub description: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub total_mileage: Option<f64>,
    pub additional_service: Option<String>,

    pub status: OfferStatus,

    // Snapshot du driver au moment de l'assignation
    pub driver_first_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_plate: Option<String>,

    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ClientId",
        to = "super::users::Column::Id"
    )]
    Client,

    #[sea_orm(
        belongs_to = "super::drivers::Entity",
        from = "Column::DriverId",
        to = "super::drivers::Column::Id"
    )]
    AssignedDriver,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::drivers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignedDriver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
