// DTOs partagés entre routes et services.
// Les objets *Update sont des patchs partiels: chaque champ est optionnel et
// seul un champ fourni est appliqué, via une unique fonction de merge dans le
// service concerné (jamais de set d'attributs dynamique).

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::drivers;
use super::enums::{ApprovalStatus, OfferStatus, OperationalStatus, UserRole};
use super::offers;
use super::users;

// ===== AUTH =====

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub company_representative: Option<String>,
    pub emergency_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

// ===== USERS =====

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub company_representative: Option<String>,
    pub emergency_phone: Option<String>,
    pub email_verified: bool,
    pub account_status: ApprovalStatus,
    pub approval_notes: Option<String>,
    pub approved_at: Option<chrono::NaiveDateTime>,
    pub created_at: Option<chrono::NaiveDateTime>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            role: user.role,
            company_name: user.company_name,
            address: user.address,
            phone_number: user.phone_number,
            company_representative: user.company_representative,
            emergency_phone: user.emergency_phone,
            email_verified: user.email_verified,
            account_status: user.account_status,
            approval_notes: user.approval_notes,
            approved_at: user.approved_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub company_representative: Option<String>,
    pub emergency_phone: Option<String>,
}

/// Décision d'approbation admin (compte OU profil driver).
/// "pending" n'est pas une décision valide.
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub status: ApprovalStatus,
    pub notes: Option<String>,
}

// ===== DRIVERS =====

#[derive(Debug, Deserialize, Validate)]
pub struct DriverCreateRequest {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub license_number: String,
    pub license_expiry: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: String,
    pub vehicle_color: String,
    #[validate(length(min = 1))]
    pub vehicle_plate: String,
    pub insurance_number: String,
    pub insurance_expiry: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct DriverUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_plate: Option<String>,
    pub insurance_number: Option<String>,
    pub insurance_expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DriverStatusRequest {
    pub status: String, // available, busy, offline
}

#[derive(Debug, Serialize)]
pub struct DriverResponse {
    pub id: i32,
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub license_number: String,
    pub license_expiry: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: String,
    pub vehicle_color: String,
    pub vehicle_plate: String,
    pub insurance_number: String,
    pub insurance_expiry: String,
    pub driver_status: ApprovalStatus,
    pub driver_approval_notes: Option<String>,
    pub driver_approved_at: Option<chrono::NaiveDateTime>,
    pub status: OperationalStatus,
    pub rating: f64,
    pub total_deliveries: i32,
    pub created_at: Option<chrono::NaiveDateTime>,
}

impl From<drivers::Model> for DriverResponse {
    fn from(driver: drivers::Model) -> Self {
        DriverResponse {
            id: driver.id,
            user_id: driver.user_id,
            first_name: driver.first_name,
            last_name: driver.last_name,
            phone_number: driver.phone_number,
            license_number: driver.license_number,
            license_expiry: driver.license_expiry,
            vehicle_make: driver.vehicle_make,
            vehicle_model: driver.vehicle_model,
            vehicle_year: driver.vehicle_year,
            vehicle_color: driver.vehicle_color,
            vehicle_plate: driver.vehicle_plate,
            insurance_number: driver.insurance_number,
            insurance_expiry: driver.insurance_expiry,
            driver_status: driver.driver_status,
            driver_approval_notes: driver.driver_approval_notes,
            driver_approved_at: driver.driver_approved_at,
            status: driver.status,
            rating: driver.rating,
            total_deliveries: driver.total_deliveries,
            created_at: driver.created_at,
        }
    }
}

// ===== OFFERS =====

#[derive(Debug, Deserialize, Validate)]
pub struct OfferCreateRequest {
    pub company_representative: String,
    pub emergency_phone: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub pickup_date: String,
    pub pickup_time: String,
    #[validate(length(min = 1))]
    pub pickup_address: String,
    #[validate(length(min = 1))]
    pub dropoff_address: String,
    pub total_mileage: Option<f64>,
    pub additional_service: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OfferUpdateRequest {
    pub company_representative: Option<String>,
    pub emergency_phone: Option<String>,
    pub description: Option<String>,
    pub pickup_date: Option<String>,
    pub pickup_time: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub total_mileage: Option<f64>,
    pub additional_service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OfferStatusUpdateRequest {
    pub status: String, // in_progress, completed, cancelled
    pub notes: Option<String>,
}

/// Statut cible d'une assignation admin (matched par défaut)
#[derive(Debug, Deserialize, Default)]
pub struct AdminAssignRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
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
    pub driver_first_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_plate: Option<String>,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

impl From<offers::Model> for OfferResponse {
    fn from(offer: offers::Model) -> Self {
        OfferResponse {
            id: offer.id,
            client_id: offer.client_id,
            driver_id: offer.driver_id,
            company_representative: offer.company_representative,
            emergency_phone: offer.emergency_phone,
            description: offer.description,
            pickup_date: offer.pickup_date,
            pickup_time: offer.pickup_time,
            pickup_address: offer.pickup_address,
            dropoff_address: offer.dropoff_address,
            total_mileage: offer.total_mileage,
            additional_service: offer.additional_service,
            status: offer.status,
            driver_first_name: offer.driver_first_name,
            driver_phone: offer.driver_phone,
            vehicle_make: offer.vehicle_make,
            vehicle_model: offer.vehicle_model,
            vehicle_color: offer.vehicle_color,
            vehicle_plate: offer.vehicle_plate,
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

/// Copie immuable des attributs du driver, capturée UNE FOIS au moment de
/// l'assignation et écrite dans l'offre. Ne se resynchronise jamais si le
/// profil driver est modifié ensuite.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSnapshot {
    pub driver_first_name: String,
    pub driver_phone: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_color: String,
    pub vehicle_plate: String,
}

impl DriverSnapshot {
    pub fn capture(driver: &drivers::Model) -> Self {
        DriverSnapshot {
            driver_first_name: driver.first_name.clone(),
            driver_phone: driver.phone_number.clone(),
            vehicle_make: driver.vehicle_make.clone(),
            vehicle_model: driver.vehicle_model.clone(),
            vehicle_color: driver.vehicle_color.clone(),
            vehicle_plate: driver.vehicle_plate.clone(),
        }
    }
}

// ===== REPORTS =====

#[derive(Debug, Serialize)]
pub struct TripsReportResponse {
    pub summary: TripsSummary,
    pub trips: Vec<TripRow>,
}

#[derive(Debug, Serialize)]
pub struct TripsSummary {
    pub total_trips: u64,
    pub total_mileage: f64,
    pub average_mileage: f64,
    pub completed_trips: u64,
    pub completion_rate: f64,
    pub status_counts: std::collections::HashMap<String, u64>,
    pub unique_drivers: u64,
    pub unique_clients: u64,
}

#[derive(Debug, Serialize)]
pub struct TripRow {
    pub id: i32,
    pub pickup_date: String,
    pub pickup_time: String,
    pub client_name: String,
    pub driver_name: String,
    pub vehicle_info: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub total_mileage: f64,
    pub status: OfferStatus,
    pub description: String,
}
