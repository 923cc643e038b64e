// ============================================================================
// USER SERVICE - COMPTES ET APPROBATION
// ============================================================================
//
// Signup en deux phases indépendantes:
//   1. user + token de vérification commis en base (transaction)
//   2. envoi de l'email de vérification, best-effort (tâche détachée)
// Un échec d'envoi est loggé et ne remet JAMAIS en cause le compte créé.
//
// L'approbation de compte est décidée par un admin, jamais par soi-même.
//
// ============================================================================

use sea_orm::*;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::dto::{ApprovalRequest, SignupRequest, UserUpdate};
use crate::models::enums::ApprovalStatus;
use crate::models::{email_verification_tokens, users};
use crate::utils::{email, jwt, password};

pub struct UserService;

impl UserService {
    /// Inscription. Le compte démarre non vérifié et pending.
    pub async fn signup(
        db: &DatabaseConnection,
        data: SignupRequest,
    ) -> Result<users::Model, ServiceError> {
        // 1. Unicité de l'email
        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(&data.email))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        // 2. Hash du mot de passe
        let password_hash =
            password::hash_password(&data.password).map_err(ServiceError::Internal)?;

        let now = Utc::now().naive_utc();
        let token = Uuid::new_v4().to_string();

        // 3. User + token de vérification dans une seule transaction
        let txn = db.begin().await?;

        let new_user = users::ActiveModel {
            email: Set(data.email),
            password_hash: Set(password_hash),
            role: Set(data.role),
            company_name: Set(data.company_name),
            address: Set(data.address),
            phone_number: Set(data.phone_number),
            company_representative: Set(data.company_representative),
            emergency_phone: Set(data.emergency_phone),
            email_verified: Set(false),
            account_status: Set(ApprovalStatus::Pending),
            approval_notes: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            created_at: Set(Some(now)),
            ..Default::default()
        };
        let user = new_user.insert(&txn).await?;

        let verification = email_verification_tokens::ActiveModel {
            user_id: Set(user.id),
            token: Set(token.clone()),
            expires_at: Set(now + Duration::hours(24)),
            used: Set(false),
            created_at: Set(Some(now)),
            ..Default::default()
        };
        verification.insert(&txn).await?;

        txn.commit().await?;

        // 4. Envoi de l'email APRÈS le commit: le signup est déjà acquis,
        //    un échec du mailer est seulement loggé
        let recipient = user.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email::send_verification_email(&recipient, &token).await {
                tracing::warn!(email = %recipient, "verification email failed: {}", e);
            }
        });

        Ok(user)
    }

    /// Consomme un token de vérification (une seule fois, avant expiration)
    pub async fn verify_email(db: &DatabaseConnection, token: &str) -> Result<(), ServiceError> {
        let verification = email_verification_tokens::Entity::find()
            .filter(email_verification_tokens::Column::Token.eq(token))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidInput("Invalid verification token".to_string())
            })?;

        if verification.used {
            return Err(ServiceError::InvalidInput(
                "Verification token has already been used".to_string(),
            ));
        }
        if verification.expires_at < Utc::now().naive_utc() {
            return Err(ServiceError::InvalidInput(
                "Verification token has expired".to_string(),
            ));
        }

        let user = users::Entity::find_by_id(verification.user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let txn = db.begin().await?;

        let mut verified_user: users::ActiveModel = user.into();
        verified_user.email_verified = Set(true);
        verified_user.update(&txn).await?;

        let mut consumed: email_verification_tokens::ActiveModel = verification.into();
        consumed.used = Set(true);
        consumed.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Login: credentials puis vérification email. L'approbation ne bloque
    /// pas le login, elle bloque les actions protégées.
    pub async fn login(
        db: &DatabaseConnection,
        email_addr: &str,
        plain_password: &str,
    ) -> Result<(String, users::Model), ServiceError> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email_addr))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::Unauthorized("Incorrect email or password".to_string())
            })?;

        let valid = password::verify_password(plain_password, &user.password_hash)
            .map_err(ServiceError::Internal)?;
        if !valid {
            return Err(ServiceError::Unauthorized(
                "Incorrect email or password".to_string(),
            ));
        }

        if !user.email_verified {
            return Err(ServiceError::Forbidden(
                "Please verify your email first".to_string(),
            ));
        }

        let token = jwt::generate_token(&user.email).map_err(ServiceError::Internal)?;
        Ok((token, user))
    }

    /// Décision d'approbation d'un compte par un admin
    pub async fn set_approval(
        db: &DatabaseConnection,
        admin: &users::Model,
        user_id: i32,
        decision: ApprovalRequest,
    ) -> Result<users::Model, ServiceError> {
        // Jamais sur son propre compte
        if admin.id == user_id {
            return Err(ServiceError::Conflict(
                "Administrators cannot change the approval status of their own account"
                    .to_string(),
            ));
        }
        if decision.status == ApprovalStatus::Pending {
            return Err(ServiceError::InvalidInput(
                "Approval status must be approved, rejected or suspended".to_string(),
            ));
        }

        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let mut active: users::ActiveModel = user.into();
        active.account_status = Set(decision.status);
        active.approval_notes = Set(decision.notes);
        active.approved_by = Set(Some(admin.id));
        active.approved_at = Set(Some(Utc::now().naive_utc()));

        let updated = active.update(db).await?;
        tracing::info!(
            user_id,
            admin_id = admin.id,
            status = %updated.account_status.to_value(),
            "account approval updated"
        );
        Ok(updated)
    }

    /// Mise à jour admin d'un compte (patch partiel)
    pub async fn update_user(
        db: &DatabaseConnection,
        user_id: i32,
        patch: UserUpdate,
    ) -> Result<users::Model, ServiceError> {
        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        // Changement d'email: re-vérifier l'unicité
        if let Some(new_email) = &patch.email {
            if new_email != &user.email {
                let taken = users::Entity::find()
                    .filter(users::Column::Email.eq(new_email))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(
                        "Email already registered".to_string(),
                    ));
                }
            }
        }

        let updated = Self::apply_user_update(user, &patch).update(db).await?;
        Ok(updated)
    }

    /// Suppression d'un compte par un admin (jamais le sien)
    pub async fn delete_user(
        db: &DatabaseConnection,
        admin: &users::Model,
        user_id: i32,
    ) -> Result<(), ServiceError> {
        if admin.id == user_id {
            return Err(ServiceError::Conflict(
                "Administrators cannot delete their own account".to_string(),
            ));
        }

        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        users::Entity::delete_by_id(user.id).exec(db).await?;
        Ok(())
    }

    /// Merge d'un patch partiel de compte
    pub fn apply_user_update(user: users::Model, patch: &UserUpdate) -> users::ActiveModel {
        let mut active: users::ActiveModel = user.into();

        if let Some(v) = &patch.email {
            active.email = Set(v.clone());
        }
        if let Some(v) = &patch.company_name {
            active.company_name = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.address {
            active.address = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.phone_number {
            active.phone_number = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.company_representative {
            active.company_representative = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.emergency_phone {
            active.emergency_phone = Set(Some(v.clone()));
        }

        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::UserRole;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user_fixture(id: i32, email: &str, role: UserRole) -> users::Model {
        users::Model {
            id,
            email: email.to_string(),
            password_hash: "x".to_string(),
            role,
            company_name: None,
            address: None,
            phone_number: None,
            company_representative: None,
            emergency_phone: None,
            email_verified: true,
            account_status: ApprovalStatus::Pending,
            approval_notes: None,
            approved_by: None,
            approved_at: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_admin_cannot_approve_own_account() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let admin = user_fixture(1, "admin@flowrelay.app", UserRole::Admin);

        let decision = ApprovalRequest {
            status: ApprovalStatus::Approved,
            notes: None,
        };
        let err = UserService::set_approval(&db, &admin, 1, decision)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_own_account() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let admin = user_fixture(1, "admin@flowrelay.app", UserRole::Admin);

        let err = UserService::delete_user(&db, &admin, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_fixture(5, "taken@example.com", UserRole::Client)]])
            .into_connection();

        let request = SignupRequest {
            email: "taken@example.com".to_string(),
            password: "long-enough-password".to_string(),
            role: UserRole::Client,
            company_name: None,
            address: None,
            phone_number: None,
            company_representative: None,
            emergency_phone: None,
        };
        let err = UserService::signup(&db, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("Email")));
    }

    #[test]
    fn test_apply_user_update_is_partial() {
        let user = user_fixture(5, "client@example.com", UserRole::Client);
        let patch = UserUpdate {
            company_name: Some("Transport Lavoie".to_string()),
            ..Default::default()
        };

        let active = UserService::apply_user_update(user, &patch);
        assert_eq!(
            active.company_name.clone().unwrap(),
            Some("Transport Lavoie".to_string())
        );
        assert!(!active.email.is_set());
        assert!(!active.account_status.is_set());
    }
}
