// ============================================================================
// MODÈLE : DRIVERS
// ============================================================================
//
// Description:
//   Profil driver, en relation 1:1 avec un user de rôle "driver".
//   Créé après le signup (premier setup), toujours en attente d'approbation
//   admin au départ.
//
// Workflow d'approbation:
//   1. User (role=driver) crée son profil via POST /api/driver/profile
//   2. Le profil démarre avec driver_status = pending et status = offline
//   3. Un admin décide via PUT /api/admin/drivers/{id}/approval
//   4. Passage à approved  → status repasse à "available"
//   5. Sortie d'approved (rejected/suspended) → status forcé à "offline"
//
// Points d'attention:
//   - license_number et vehicle_plate sont uniques sur TOUTE la table
//   - driver_status (approbation) et status (disponibilité) sont deux enums
//     distincts, mutés uniquement via DriverService pour tenir l'invariant
//   - total_deliveries est incrémenté à chaque offre complétée
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{ApprovalStatus, OperationalStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drivers_rust")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,

    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,

    #[sea_orm(unique)]
    pub license_number: String,
    pub license_expiry: String,

    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: String,
    pub vehicle_color: String,
    #[sea_orm(unique)]
    pub vehicle_plate: String,

    pub insurance_number: String,
    pub insurance_expiry: String,

    // Approbation du profil driver, indépendante de l'approbation du compte
    pub driver_status: ApprovalStatus,
    pub driver_approval_notes: Option<String>,
    pub driver_approved_by: Option<i32>,
    pub driver_approved_at: Option<DateTime>,

    pub status: OperationalStatus,
    pub rating: f64,
    pub total_deliveries: i32,

    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::offers::Entity")]
    AssignedOffers,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignedOffers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
