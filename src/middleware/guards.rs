// ============================================================================
// GUARDS - GATES D'APPROBATION
// ============================================================================
//
// Description:
//   Les préconditions consultées avant toute action protégée:
//   - require_user : identité + email vérifié (sans exiger l'approbation)
//   - require_admin / require_driver_role : contrôle du rôle
//   - require_approved_account : gate d'approbation du compte (création et
//     modification d'offres côté client)
//   - require_approved_driver : gate d'approbation du profil driver
//     (toutes les actions driver sur les offres)
//
// Points d'attention:
//   - Les admins sont exemptés du workflow d'approbation de compte, mais pas
//     de la vérification email
//   - L'absence de profil driver est un échec distinct ("Driver profile not
//     found"), différent d'un profil non approuvé
//   - check_verified / check_account_access / check_driver_access sont des
//     fonctions pures sur le modèle, testables sans base
//
// ============================================================================

use sea_orm::*;

use crate::errors::ServiceError;
use crate::middleware::AuthUser;
use crate::models::drivers;
use crate::models::enums::{ApprovalStatus, UserRole};
use crate::models::users;

/// Email vérifié ?
pub fn check_verified(user: &users::Model) -> Result<(), ServiceError> {
    if !user.email_verified {
        return Err(ServiceError::Forbidden(
            "Email not verified. Please verify your email first.".to_string(),
        ));
    }
    Ok(())
}

/// Gate d'approbation du compte. Les admins court-circuitent le workflow.
pub fn check_account_access(user: &users::Model) -> Result<(), ServiceError> {
    check_verified(user)?;

    if user.role == UserRole::Admin {
        return Ok(());
    }

    match user.account_status {
        ApprovalStatus::Approved => Ok(()),
        ApprovalStatus::Pending => Err(ServiceError::Forbidden(
            "Your account is pending admin approval. Please wait for approval to access the system."
                .to_string(),
        )),
        ApprovalStatus::Rejected => Err(ServiceError::Forbidden(
            "Your account has been rejected. Please contact support.".to_string(),
        )),
        ApprovalStatus::Suspended => Err(ServiceError::Forbidden(
            "Your account has been suspended. Please contact support.".to_string(),
        )),
    }
}

/// Gate d'approbation du profil driver (même forme à quatre états, appliquée
/// à driver_status)
pub fn check_driver_access(driver: &drivers::Model) -> Result<(), ServiceError> {
    match driver.driver_status {
        ApprovalStatus::Approved => Ok(()),
        ApprovalStatus::Pending => Err(ServiceError::Forbidden(
            "Your driver profile is pending admin approval. Please wait for approval.".to_string(),
        )),
        ApprovalStatus::Rejected => Err(ServiceError::Forbidden(
            "Your driver profile has been rejected. Please contact support.".to_string(),
        )),
        ApprovalStatus::Suspended => Err(ServiceError::Forbidden(
            "Your driver profile has been suspended. Please contact support.".to_string(),
        )),
    }
}

/// Résout l'utilisateur du token et vérifie son email
pub async fn require_user(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<users::Model, ServiceError> {
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(&auth.email))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("Could not validate credentials".to_string()))?;

    check_verified(&user)?;

    Ok(user)
}

pub async fn require_admin(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<users::Model, ServiceError> {
    let user = require_user(db, auth).await?;
    if user.role != UserRole::Admin {
        return Err(ServiceError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}

pub async fn require_driver_role(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<users::Model, ServiceError> {
    let user = require_user(db, auth).await?;
    if user.role != UserRole::Driver {
        return Err(ServiceError::Forbidden("Driver access required".to_string()));
    }
    Ok(user)
}

/// Gate complet pour les actions client sur les offres
pub async fn require_approved_account(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<users::Model, ServiceError> {
    let user = require_user(db, auth).await?;
    check_account_access(&user)?;
    Ok(user)
}

/// Gate complet pour les actions driver: rôle + profil existant + approbation
pub async fn require_approved_driver(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<drivers::Model, ServiceError> {
    let user = require_driver_role(db, auth).await?;

    let driver = drivers::Entity::find()
        .filter(drivers::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound("Driver profile not found. Please create one.".to_string())
        })?;

    check_driver_access(&driver)?;

    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::OperationalStatus;

    fn user_fixture(role: UserRole, verified: bool, status: ApprovalStatus) -> users::Model {
        users::Model {
            id: 1,
            email: "someone@example.com".to_string(),
            password_hash: "x".to_string(),
            role,
            company_name: None,
            address: None,
            phone_number: None,
            company_representative: None,
            emergency_phone: None,
            email_verified: verified,
            account_status: status,
            approval_notes: None,
            approved_by: None,
            approved_at: None,
            created_at: None,
        }
    }

    fn driver_fixture(status: ApprovalStatus) -> drivers::Model {
        drivers::Model {
            id: 3,
            user_id: 1,
            first_name: "Marc".to_string(),
            last_name: "Tremblay".to_string(),
            phone_number: "514-555-0199".to_string(),
            license_number: "L-12345".to_string(),
            license_expiry: "2027-01-01".to_string(),
            vehicle_make: "Ford".to_string(),
            vehicle_model: "Transit".to_string(),
            vehicle_year: "2021".to_string(),
            vehicle_color: "White".to_string(),
            vehicle_plate: "ABC-123".to_string(),
            insurance_number: "INS-9".to_string(),
            insurance_expiry: "2027-01-01".to_string(),
            driver_status: status,
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

    #[test]
    fn test_unverified_user_is_denied() {
        let user = user_fixture(UserRole::Client, false, ApprovalStatus::Approved);
        let err = check_account_access(&user).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(msg) if msg.contains("not verified")));
    }

    #[test]
    fn test_account_gate_denies_every_non_approved_status() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Rejected,
            ApprovalStatus::Suspended,
        ] {
            let user = user_fixture(UserRole::Client, true, status.clone());
            let err = check_account_access(&user).unwrap_err();
            // Chaque statut doit produire un message distinct
            match (&status, &err) {
                (ApprovalStatus::Pending, ServiceError::Forbidden(m)) => {
                    assert!(m.contains("pending"))
                }
                (ApprovalStatus::Rejected, ServiceError::Forbidden(m)) => {
                    assert!(m.contains("rejected"))
                }
                (ApprovalStatus::Suspended, ServiceError::Forbidden(m)) => {
                    assert!(m.contains("suspended"))
                }
                _ => panic!("expected Forbidden, got {:?}", err),
            }
        }
    }

    #[test]
    fn test_approved_client_is_allowed() {
        let user = user_fixture(UserRole::Client, true, ApprovalStatus::Approved);
        assert!(check_account_access(&user).is_ok());
    }

    #[test]
    fn test_admin_bypasses_account_approval() {
        // Un admin passe le gate quel que soit son account_status
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Rejected,
            ApprovalStatus::Suspended,
        ] {
            let user = user_fixture(UserRole::Admin, true, status);
            assert!(check_account_access(&user).is_ok());
        }
    }

    #[test]
    fn test_admin_still_needs_verified_email() {
        let user = user_fixture(UserRole::Admin, false, ApprovalStatus::Approved);
        assert!(check_account_access(&user).is_err());
    }

    #[test]
    fn test_driver_gate() {
        assert!(check_driver_access(&driver_fixture(ApprovalStatus::Approved)).is_ok());

        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Rejected,
            ApprovalStatus::Suspended,
        ] {
            let err = check_driver_access(&driver_fixture(status)).unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
    }
}
