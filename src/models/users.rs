use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::{ApprovalStatus, UserRole};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users_rust")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)] // Ne jamais exposer le hash en JSON
    pub password_hash: String,
    pub role: UserRole,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub company_representative: Option<String>,
    pub emergency_phone: Option<String>,
    pub email_verified: bool,

    // Approbation du compte par un admin (jamais par soi-même)
    pub account_status: ApprovalStatus,
    pub approval_notes: Option<String>,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime>,

    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::offers::Entity")]
    Offers,

    #[sea_orm(has_one = "super::drivers::Entity")]
    DriverProfile,

    #[sea_orm(has_many = "super::email_verification_tokens::Entity")]
    EmailVerificationTokens,
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::drivers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DriverProfile.def()
    }
}

impl Related<super::email_verification_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmailVerificationTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
