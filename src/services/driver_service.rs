// ============================================================================
// DRIVER SERVICE - PROFILS ET DISPONIBILITÉ
// ============================================================================
//
// Toutes les mutations de driver_status passent par set_approval, le seul
// endroit qui écrit le couple (driver_status, status). Invariant tenu ici:
//   - driver_status != approved  => status = offline
//   - passage à approved         => status = available
//
// Les changements de disponibilité par le driver lui-même (available/busy/
// offline) sont consultatifs; le matcher impose busy/available pendant une
// assignation active.
//
// ============================================================================

use sea_orm::*;
use chrono::Utc;

use crate::errors::ServiceError;
use crate::models::dto::{ApprovalRequest, DriverCreateRequest, DriverUpdate};
use crate::models::enums::{ApprovalStatus, OperationalStatus};
use crate::models::{drivers, users};

pub struct DriverService;

impl DriverService {
    /// Création du profil (premier setup). Démarre pending + offline.
    pub async fn create_profile(
        db: &DatabaseConnection,
        user: &users::Model,
        data: DriverCreateRequest,
    ) -> Result<drivers::Model, ServiceError> {
        // 1. Un seul profil par user
        let existing = drivers::Entity::find()
            .filter(drivers::Column::UserId.eq(user.id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Driver profile already exists".to_string(),
            ));
        }

        // 2. Unicité globale de la licence
        let license_taken = drivers::Entity::find()
            .filter(drivers::Column::LicenseNumber.eq(&data.license_number))
            .one(db)
            .await?;
        if license_taken.is_some() {
            return Err(ServiceError::Conflict(
                "License number already registered".to_string(),
            ));
        }

        // 3. Unicité globale de la plaque
        let plate_taken = drivers::Entity::find()
            .filter(drivers::Column::VehiclePlate.eq(&data.vehicle_plate))
            .one(db)
            .await?;
        if plate_taken.is_some() {
            return Err(ServiceError::Conflict(
                "Vehicle plate already registered".to_string(),
            ));
        }

        let now = Utc::now().naive_utc();

        let new_driver = drivers::ActiveModel {
            user_id: Set(user.id),
            first_name: Set(data.first_name),
            last_name: Set(data.last_name),
            phone_number: Set(data.phone_number),
            license_number: Set(data.license_number),
            license_expiry: Set(data.license_expiry),
            vehicle_make: Set(data.vehicle_make),
            vehicle_model: Set(data.vehicle_model),
            vehicle_year: Set(data.vehicle_year),
            vehicle_color: Set(data.vehicle_color),
            vehicle_plate: Set(data.vehicle_plate),
            insurance_number: Set(data.insurance_number),
            insurance_expiry: Set(data.insurance_expiry),
            driver_status: Set(ApprovalStatus::Pending),
            driver_approval_notes: Set(None),
            driver_approved_by: Set(None),
            driver_approved_at: Set(None),
            status: Set(OperationalStatus::Offline), // offline tant que non approuvé
            rating: Set(5.0),
            total_deliveries: Set(0),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        };

        let driver = new_driver.insert(db).await?;
        Ok(driver)
    }

    /// Mise à jour du profil par son propriétaire (patch partiel).
    /// Interdit si le profil est rejected ou suspended.
    pub async fn update_profile(
        db: &DatabaseConnection,
        user_id: i32,
        patch: DriverUpdate,
    ) -> Result<drivers::Model, ServiceError> {
        let driver = drivers::Entity::find()
            .filter(drivers::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Driver profile not found".to_string()))?;

        if driver.driver_status == ApprovalStatus::Rejected
            || driver.driver_status == ApprovalStatus::Suspended
        {
            return Err(ServiceError::Forbidden(
                "Cannot update profile. Profile is rejected or suspended.".to_string(),
            ));
        }

        // Re-vérifier l'unicité seulement si la valeur change
        if let Some(license) = &patch.license_number {
            if license != &driver.license_number {
                let taken = drivers::Entity::find()
                    .filter(drivers::Column::LicenseNumber.eq(license))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(
                        "License number already registered".to_string(),
                    ));
                }
            }
        }
        if let Some(plate) = &patch.vehicle_plate {
            if plate != &driver.vehicle_plate {
                let taken = drivers::Entity::find()
                    .filter(drivers::Column::VehiclePlate.eq(plate))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(
                        "Vehicle plate already registered".to_string(),
                    ));
                }
            }
        }

        let updated = Self::apply_driver_update(driver, &patch).update(db).await?;
        Ok(updated)
    }

    /// Changement de disponibilité par le driver (consultatif)
    pub async fn set_status(
        db: &DatabaseConnection,
        driver: &drivers::Model,
        status_str: &str,
    ) -> Result<drivers::Model, ServiceError> {
        let status = OperationalStatus::try_from_value(&status_str.to_string()).map_err(|_| {
            ServiceError::InvalidInput(
                "Invalid status. Must be one of: available, busy, offline".to_string(),
            )
        })?;

        let mut active: drivers::ActiveModel = driver.clone().into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().naive_utc()));

        let updated = active.update(db).await?;
        Ok(updated)
    }

    /// Décision d'approbation admin. Seul point d'écriture du couple
    /// (driver_status, status).
    pub async fn set_approval(
        db: &DatabaseConnection,
        admin: &users::Model,
        driver_id: i32,
        decision: ApprovalRequest,
    ) -> Result<drivers::Model, ServiceError> {
        if decision.status == ApprovalStatus::Pending {
            return Err(ServiceError::InvalidInput(
                "Approval status must be approved, rejected or suspended".to_string(),
            ));
        }

        let driver = drivers::Entity::find_by_id(driver_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Driver not found".to_string()))?;

        // Un admin ne décide jamais pour son propre profil
        if driver.user_id == admin.id {
            return Err(ServiceError::Conflict(
                "Administrators cannot change the approval status of their own driver profile"
                    .to_string(),
            ));
        }

        let mut active: drivers::ActiveModel = driver.into();
        active.status = Set(Self::operational_for(&decision.status));
        active.driver_status = Set(decision.status);
        active.driver_approval_notes = Set(decision.notes);
        active.driver_approved_by = Set(Some(admin.id));
        active.driver_approved_at = Set(Some(Utc::now().naive_utc()));
        active.updated_at = Set(Some(Utc::now().naive_utc()));

        let updated = active.update(db).await?;
        tracing::info!(
            driver_id,
            admin_id = admin.id,
            status = %updated.driver_status.to_value(),
            "driver approval updated"
        );
        Ok(updated)
    }

    /// Disponibilité imposée par une décision d'approbation
    pub fn operational_for(approval: &ApprovalStatus) -> OperationalStatus {
        match approval {
            ApprovalStatus::Approved => OperationalStatus::Available,
            _ => OperationalStatus::Offline,
        }
    }

    /// Merge d'un patch partiel de profil
    pub fn apply_driver_update(
        driver: drivers::Model,
        patch: &DriverUpdate,
    ) -> drivers::ActiveModel {
        let mut active: drivers::ActiveModel = driver.into();

        if let Some(v) = &patch.first_name {
            active.first_name = Set(v.clone());
        }
        if let Some(v) = &patch.last_name {
            active.last_name = Set(v.clone());
        }
        if let Some(v) = &patch.phone_number {
            active.phone_number = Set(v.clone());
        }
        if let Some(v) = &patch.license_number {
            active.license_number = Set(v.clone());
        }
        if let Some(v) = &patch.license_expiry {
            active.license_expiry = Set(v.clone());
        }
        if let Some(v) = &patch.vehicle_make {
            active.vehicle_make = Set(v.clone());
        }
        if let Some(v) = &patch.vehicle_model {
            active.vehicle_model = Set(v.clone());
        }
        if let Some(v) = &patch.vehicle_year {
            active.vehicle_year = Set(v.clone());
        }
        if let Some(v) = &patch.vehicle_color {
            active.vehicle_color = Set(v.clone());
        }
        if let Some(v) = &patch.vehicle_plate {
            active.vehicle_plate = Set(v.clone());
        }
        if let Some(v) = &patch.insurance_number {
            active.insurance_number = Set(v.clone());
        }
        if let Some(v) = &patch.insurance_expiry {
            active.insurance_expiry = Set(v.clone());
        }

        active.updated_at = Set(Some(Utc::now().naive_utc()));
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::UserRole;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn admin_fixture(id: i32) -> users::Model {
        users::Model {
            id,
            email: "admin@flowrelay.app".to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Admin,
            company_name: None,
            address: None,
            phone_number: None,
            company_representative: None,
            emergency_phone: None,
            email_verified: true,
            account_status: ApprovalStatus::Approved,
            approval_notes: None,
            approved_by: None,
            approved_at: None,
            created_at: None,
        }
    }

    fn driver_fixture(id: i32, user_id: i32, license: &str) -> drivers::Model {
        drivers::Model {
            id,
            user_id,
            first_name: "Marc".to_string(),
            last_name: "Tremblay".to_string(),
            phone_number: "514-555-0199".to_string(),
            license_number: license.to_string(),
            license_expiry: "2027-01-01".to_string(),
            vehicle_make: "Ford".to_string(),
            vehicle_model: "Transit".to_string(),
            vehicle_year: "2021".to_string(),
            vehicle_color: "White".to_string(),
            vehicle_plate: "ABC-123".to_string(),
            insurance_number: "INS-9".to_string(),
            insurance_expiry: "2027-01-01".to_string(),
            driver_status: ApprovalStatus::Pending,
            driver_approval_notes: None,
            driver_approved_by: None,
            driver_approved_at: None,
            status: OperationalStatus::Offline,
            rating: 5.0,
            total_deliveries: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn create_request(license: &str, plate: &str) -> DriverCreateRequest {
        DriverCreateRequest {
            first_name: "Marc".to_string(),
            last_name: "Tremblay".to_string(),
            phone_number: "514-555-0199".to_string(),
            license_number: license.to_string(),
            license_expiry: "2027-01-01".to_string(),
            vehicle_make: "Ford".to_string(),
            vehicle_model: "Transit".to_string(),
            vehicle_year: "2021".to_string(),
            vehicle_color: "White".to_string(),
            vehicle_plate: plate.to_string(),
            insurance_number: "INS-9".to_string(),
            insurance_expiry: "2027-01-01".to_string(),
        }
    }

    #[test]
    fn test_operational_status_follows_approval() {
        assert_eq!(
            DriverService::operational_for(&ApprovalStatus::Approved),
            OperationalStatus::Available
        );
        // Toute sortie d'approved force offline
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Rejected,
            ApprovalStatus::Suspended,
        ] {
            assert_eq!(
                DriverService::operational_for(&status),
                OperationalStatus::Offline
            );
        }
    }

    #[test]
    fn test_apply_driver_update_is_partial() {
        let driver = driver_fixture(3, 10, "L-12345");
        let patch = DriverUpdate {
            phone_number: Some("514-555-0000".to_string()),
            ..Default::default()
        };

        let active = DriverService::apply_driver_update(driver, &patch);
        assert_eq!(active.phone_number.clone().unwrap(), "514-555-0000");
        assert!(!active.license_number.is_set());
        assert!(!active.driver_status.is_set());
    }

    #[tokio::test]
    async fn test_duplicate_license_is_a_conflict() {
        // Pas de profil existant pour ce user, mais la licence appartient
        // déjà à un autre driver
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<drivers::Model>::new(),
                vec![driver_fixture(8, 99, "L-12345")],
            ])
            .into_connection();

        let user = admin_fixture(10);
        let err = DriverService::create_profile(&db, &user, create_request("L-12345", "ZZZ-999"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("License number")));
    }

    #[tokio::test]
    async fn test_duplicate_profile_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![driver_fixture(8, 10, "L-0")]])
            .into_connection();

        let user = admin_fixture(10);
        let err = DriverService::create_profile(&db, &user, create_request("L-1", "P-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("already exists")));
    }

    #[tokio::test]
    async fn test_admin_cannot_approve_own_driver_profile() {
        let admin = admin_fixture(10);
        // Le profil driver appartient au même user que l'admin
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![driver_fixture(3, 10, "L-12345")]])
            .into_connection();

        let decision = ApprovalRequest {
            status: ApprovalStatus::Approved,
            notes: None,
        };
        let err = DriverService::set_approval(&db, &admin, 3, decision)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_approval_decision_rejects_pending() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let admin = admin_fixture(10);

        let decision = ApprovalRequest {
            status: ApprovalStatus::Pending,
            notes: None,
        };
        let err = DriverService::set_approval(&db, &admin, 3, decision)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
