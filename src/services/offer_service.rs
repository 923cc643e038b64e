// ============================================================================
// OFFER SERVICE - MACHINE À ÉTATS DES OFFRES
// ============================================================================
//
// Machine à états:
//   pending → matched → in_progress → completed
//                  \________\______→ cancelled
//
// Toute transition qui lie ou libère un driver met à jour sa disponibilité
// dans la MÊME transaction: il n'existe aucun état observable où l'offre et
// le driver sont en désaccord.
//
// L'assignation (admin par id, ou self-accept driver) passe par un UPDATE
// conditionnel (status = pending AND driver_id IS NULL) et le compte de
// lignes affectées: de deux accepts concurrents sur la même offre, exactement
// un gagne, le perdant reçoit un Conflict.
//
// ============================================================================

use sea_orm::sea_query::Expr;
use sea_orm::*;
use chrono::Utc;

use crate::errors::ServiceError;
use crate::models::dto::{DriverSnapshot, OfferCreateRequest, OfferUpdateRequest};
use crate::models::enums::{OfferStatus, ApprovalStatus, OperationalStatus};
use crate::models::{drivers, offers, users};

pub struct OfferService;

impl OfferService {
    /// Crée une offre pour un client déjà passé par le gate d'approbation
    pub async fn create_offer(
        db: &DatabaseConnection,
        client: &users::Model,
        data: OfferCreateRequest,
    ) -> Result<offers::Model, ServiceError> {
        let now = Utc::now().naive_utc();

        let new_offer = offers::ActiveModel {
            client_id: Set(client.id),
            driver_id: Set(None),
            company_representative: Set(data.company_representative),
            emergency_phone: Set(data.emergency_phone),
            description: Set(data.description),
            pickup_date: Set(data.pickup_date),
            pickup_time: Set(data.pickup_time),
            pickup_address: Set(data.pickup_address),
            dropoff_address: Set(data.dropoff_address),
            total_mileage: Set(data.total_mileage),
            additional_service: Set(data.additional_service),
            status: Set(OfferStatus::Pending),
            driver_first_name: Set(None),
            driver_phone: Set(None),
            vehicle_make: Set(None),
            vehicle_model: Set(None),
            vehicle_color: Set(None),
            vehicle_plate: Set(None),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        };

        let offer = new_offer.insert(db).await?;
        Ok(offer)
    }

    /// Modifie une offre du client. Seules les offres pending sont éditables.
    pub async fn update_offer(
        db: &DatabaseConnection,
        client_id: i32,
        offer_id: i32,
        patch: OfferUpdateRequest,
    ) -> Result<offers::Model, ServiceError> {
        let offer = offers::Entity::find_by_id(offer_id)
            .filter(offers::Column::ClientId.eq(client_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;

        if offer.status != OfferStatus::Pending {
            return Err(ServiceError::Conflict(
                "Only pending offers are editable".to_string(),
            ));
        }

        let updated = Self::apply_offer_update(offer, &patch).update(db).await?;
        Ok(updated)
    }

    /// Variante admin: même règle d'éditabilité, sans contrainte d'ownership
    pub async fn admin_update_offer(
        db: &DatabaseConnection,
        offer_id: i32,
        patch: OfferUpdateRequest,
    ) -> Result<offers::Model, ServiceError> {
        let offer = offers::Entity::find_by_id(offer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;

        if offer.status != OfferStatus::Pending {
            return Err(ServiceError::Conflict(
                "Only pending offers are editable".to_string(),
            ));
        }

        let updated = Self::apply_offer_update(offer, &patch).update(db).await?;
        Ok(updated)
    }

    /// Self-accept: un driver approuvé et disponible prend une offre pending
    /// non assignée. De deux drivers en course sur la même offre, un seul
    /// passe le UPDATE conditionnel.
    pub async fn accept_offer(
        db: &DatabaseConnection,
        driver: &drivers::Model,
        offer_id: i32,
    ) -> Result<offers::Model, ServiceError> {
        if driver.status != OperationalStatus::Available {
            return Err(ServiceError::Conflict(
                "Driver must be available to accept offers".to_string(),
            ));
        }

        let snapshot = DriverSnapshot::capture(driver);
        Self::assign(db, offer_id, driver, snapshot, OfferStatus::Matched).await
    }

    /// Assignation admin par id de driver. Mêmes invariants que le
    /// self-accept (offre pending non assignée, driver approuvé et
    /// disponible); le statut cible doit impliquer du travail actif.
    pub async fn admin_assign_driver(
        db: &DatabaseConnection,
        offer_id: i32,
        driver_id: i32,
        target_status: Option<String>,
    ) -> Result<offers::Model, ServiceError> {
        let target = match target_status.as_deref() {
            None => OfferStatus::Matched,
            Some(raw) => OfferStatus::try_from_value(&raw.to_string()).map_err(|_| {
                ServiceError::InvalidInput(format!("Invalid status: {}", raw))
            })?,
        };
        if target != OfferStatus::Matched && target != OfferStatus::InProgress {
            return Err(ServiceError::InvalidInput(
                "Assignment status must be matched or in_progress".to_string(),
            ));
        }

        let driver = drivers::Entity::find_by_id(driver_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Driver not found".to_string()))?;

        if driver.driver_status != ApprovalStatus::Approved {
            return Err(ServiceError::Conflict(
                "Driver profile is not approved".to_string(),
            ));
        }
        if driver.status != OperationalStatus::Available {
            return Err(ServiceError::Conflict(
                "Driver is not available".to_string(),
            ));
        }

        let snapshot = DriverSnapshot::capture(&driver);
        Self::assign(db, offer_id, &driver, snapshot, target).await
    }

    /// Le cœur de l'assignation: UPDATE conditionnel sur l'offre + passage du
    /// driver à busy, dans une seule transaction.
    async fn assign(
        db: &DatabaseConnection,
        offer_id: i32,
        driver: &drivers::Model,
        snapshot: DriverSnapshot,
        target: OfferStatus,
    ) -> Result<offers::Model, ServiceError> {
        let now = Utc::now().naive_utc();
        let txn = db.begin().await?;

        // UPDATE ... WHERE id = ? AND status = 'pending' AND driver_id IS NULL
        let result = offers::Entity::update_many()
            .col_expr(offers::Column::DriverId, Expr::value(Some(driver.id)))
            .col_expr(offers::Column::Status, Expr::value(target))
            .col_expr(
                offers::Column::DriverFirstName,
                Expr::value(Some(snapshot.driver_first_name)),
            )
            .col_expr(
                offers::Column::DriverPhone,
                Expr::value(Some(snapshot.driver_phone)),
            )
            .col_expr(
                offers::Column::VehicleMake,
                Expr::value(Some(snapshot.vehicle_make)),
            )
            .col_expr(
                offers::Column::VehicleModel,
                Expr::value(Some(snapshot.vehicle_model)),
            )
            .col_expr(
                offers::Column::VehicleColor,
                Expr::value(Some(snapshot.vehicle_color)),
            )
            .col_expr(
                offers::Column::VehiclePlate,
                Expr::value(Some(snapshot.vehicle_plate)),
            )
            .col_expr(offers::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(offers::Column::Id.eq(offer_id))
            .filter(offers::Column::Status.eq(OfferStatus::Pending))
            .filter(offers::Column::DriverId.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            // Perdu la course, ou offre inexistante: diagnostiquer hors txn
            txn.rollback().await?;

            let offer = offers::Entity::find_by_id(offer_id).one(db).await?;
            return match offer {
                None => Err(ServiceError::NotFound("Offer not found".to_string())),
                Some(o) if o.driver_id.is_some() => Err(ServiceError::Conflict(
                    "Offer already assigned to another driver".to_string(),
                )),
                Some(_) => Err(ServiceError::Conflict(
                    "Offer is not available".to_string(),
                )),
            };
        }

        // Le driver passe busy dans la même unité logique
        let mut busy_driver: drivers::ActiveModel = driver.clone().into();
        busy_driver.status = Set(OperationalStatus::Busy);
        busy_driver.updated_at = Set(Some(now));
        busy_driver.update(&txn).await?;

        let offer = offers::Entity::find_by_id(offer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;

        txn.commit().await?;

        tracing::info!(offer_id, driver_id = driver.id, "offer assigned");
        Ok(offer)
    }

    /// Transition de statut par le driver assigné:
    /// matched → in_progress, in_progress → completed,
    /// matched/in_progress → cancelled.
    pub async fn update_status(
        db: &DatabaseConnection,
        driver: &drivers::Model,
        offer_id: i32,
        status_str: &str,
    ) -> Result<offers::Model, ServiceError> {
        let target = OfferStatus::try_from_value(&status_str.to_string()).map_err(|_| {
            ServiceError::InvalidInput(
                "Invalid status. Must be one of: in_progress, completed, cancelled".to_string(),
            )
        })?;
        if target == OfferStatus::Pending || target == OfferStatus::Matched {
            return Err(ServiceError::InvalidInput(
                "Invalid status. Must be one of: in_progress, completed, cancelled".to_string(),
            ));
        }

        let offer = offers::Entity::find_by_id(offer_id)
            .filter(offers::Column::DriverId.eq(driver.id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("Offer not found or not assigned to you".to_string())
            })?;

        Self::validate_transition(&offer.status, &target)?;

        let now = Utc::now().naive_utc();
        let txn = db.begin().await?;

        let mut offer_update: offers::ActiveModel = offer.into();
        offer_update.status = Set(target.clone());
        offer_update.updated_at = Set(Some(now));
        let updated_offer = offer_update.update(&txn).await?;

        // Libération inconditionnelle du driver sur état terminal
        match target {
            OfferStatus::Completed => {
                Self::complete_delivery(driver).update(&txn).await?;
            }
            OfferStatus::Cancelled => {
                Self::release_driver(driver).update(&txn).await?;
            }
            _ => {}
        }

        txn.commit().await?;

        tracing::info!(offer_id, driver_id = driver.id, status = status_str, "offer status updated");
        Ok(updated_offer)
    }

    /// Garde de la machine à états. L'erreur nomme l'état source requis.
    pub fn validate_transition(
        current: &OfferStatus,
        target: &OfferStatus,
    ) -> Result<(), ServiceError> {
        match (current, target) {
            (OfferStatus::Matched, OfferStatus::InProgress) => Ok(()),
            (OfferStatus::InProgress, OfferStatus::Completed) => Ok(()),
            (OfferStatus::Matched, OfferStatus::Cancelled)
            | (OfferStatus::InProgress, OfferStatus::Cancelled) => Ok(()),
            (_, OfferStatus::InProgress) => Err(ServiceError::Conflict(
                "Can only start matched offers".to_string(),
            )),
            (_, OfferStatus::Completed) => Err(ServiceError::Conflict(
                "Can only complete in-progress offers".to_string(),
            )),
            (_, OfferStatus::Cancelled) => Err(ServiceError::Conflict(
                "Can only cancel matched or in-progress offers".to_string(),
            )),
            _ => Err(ServiceError::Conflict(
                "Invalid status transition".to_string(),
            )),
        }
    }

    /// Merge d'un patch partiel: seuls les champs fournis sont appliqués
    pub fn apply_offer_update(
        offer: offers::Model,
        patch: &OfferUpdateRequest,
    ) -> offers::ActiveModel {
        let mut active: offers::ActiveModel = offer.into();

        if let Some(v) = &patch.company_representative {
            active.company_representative = Set(v.clone());
        }
        if let Some(v) = &patch.emergency_phone {
            active.emergency_phone = Set(v.clone());
        }
        if let Some(v) = &patch.description {
            active.description = Set(v.clone());
        }
        if let Some(v) = &patch.pickup_date {
            active.pickup_date = Set(v.clone());
        }
        if let Some(v) = &patch.pickup_time {
            active.pickup_time = Set(v.clone());
        }
        if let Some(v) = &patch.pickup_address {
            active.pickup_address = Set(v.clone());
        }
        if let Some(v) = &patch.dropoff_address {
            active.dropoff_address = Set(v.clone());
        }
        if let Some(v) = patch.total_mileage {
            active.total_mileage = Set(Some(v));
        }
        if let Some(v) = &patch.additional_service {
            active.additional_service = Set(Some(v.clone()));
        }

        active.updated_at = Set(Some(Utc::now().naive_utc()));
        active
    }

    /// Livraison terminée: deliveries +1, driver libéré
    pub fn complete_delivery(driver: &drivers::Model) -> drivers::ActiveModel {
        let mut active: drivers::ActiveModel = driver.clone().into();
        active.total_deliveries = Set(driver.total_deliveries + 1);
        active.status = Set(OperationalStatus::Available);
        active.updated_at = Set(Some(Utc::now().naive_utc()));
        active
    }

    /// Libération inconditionnelle (annulation), sans incrément
    pub fn release_driver(driver: &drivers::Model) -> drivers::ActiveModel {
        let mut active: drivers::ActiveModel = driver.clone().into();
        active.status = Set(OperationalStatus::Available);
        active.updated_at = Set(Some(Utc::now().naive_utc()));
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn driver_fixture(status: OperationalStatus) -> drivers::Model {
        drivers::Model {
            id: 3,
            user_id: 10,
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
            driver_status: ApprovalStatus::Approved,
            driver_approval_notes: None,
            driver_approved_by: None,
            driver_approved_at: None,
            status,
            rating: 5.0,
            total_deliveries: 4,
            created_at: None,
            updated_at: None,
        }
    }

    fn offer_fixture(status: OfferStatus, driver_id: Option<i32>) -> offers::Model {
        offers::Model {
            id: 7,
            client_id: 20,
            driver_id,
            company_representative: "Jane".to_string(),
            emergency_phone: "555-0100".to_string(),
            description: "Pallets".to_string(),
            pickup_date: "2025-06-01".to_string(),
            pickup_time: "09:00".to_string(),
            pickup_address: "1 Main St".to_string(),
            dropoff_address: "9 Oak Ave".to_string(),
            total_mileage: Some(12.5),
            additional_service: None,
            status,
            driver_first_name: None,
            driver_phone: None,
            vehicle_make: None,
            vehicle_model: None,
            vehicle_color: None,
            vehicle_plate: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_transition_table() {
        // Paires légales
        assert!(
            OfferService::validate_transition(&OfferStatus::Matched, &OfferStatus::InProgress)
                .is_ok()
        );
        assert!(
            OfferService::validate_transition(&OfferStatus::InProgress, &OfferStatus::Completed)
                .is_ok()
        );
        assert!(
            OfferService::validate_transition(&OfferStatus::Matched, &OfferStatus::Cancelled)
                .is_ok()
        );
        assert!(
            OfferService::validate_transition(&OfferStatus::InProgress, &OfferStatus::Cancelled)
                .is_ok()
        );

        // Tout le reste est un Conflict
        let illegal = [
            (OfferStatus::Pending, OfferStatus::InProgress),
            (OfferStatus::Pending, OfferStatus::Completed),
            (OfferStatus::Pending, OfferStatus::Cancelled),
            (OfferStatus::Matched, OfferStatus::Completed),
            (OfferStatus::Completed, OfferStatus::InProgress),
            (OfferStatus::Completed, OfferStatus::Cancelled),
            (OfferStatus::Cancelled, OfferStatus::InProgress),
            (OfferStatus::Cancelled, OfferStatus::Completed),
        ];
        for (from, to) in illegal {
            let err = OfferService::validate_transition(&from, &to).unwrap_err();
            assert!(matches!(err, ServiceError::Conflict(_)), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn test_apply_offer_update_merges_only_supplied_fields() {
        let offer = offer_fixture(OfferStatus::Pending, None);
        let patch = OfferUpdateRequest {
            description: Some("Fragile pallets".to_string()),
            total_mileage: Some(40.0),
            ..Default::default()
        };

        let active = OfferService::apply_offer_update(offer, &patch);

        assert_eq!(active.description.clone().unwrap(), "Fragile pallets");
        assert_eq!(active.total_mileage.clone().unwrap(), Some(40.0));
        // Champ non fourni: pas marqué comme modifié
        assert!(!active.pickup_address.is_set());
        // updated_at rafraîchi à chaque mutation
        assert!(active.updated_at.is_set());
    }

    #[test]
    fn test_snapshot_is_point_in_time_copy() {
        let driver = driver_fixture(OperationalStatus::Available);
        let snapshot = DriverSnapshot::capture(&driver);

        assert_eq!(snapshot.driver_first_name, "Marc");
        assert_eq!(snapshot.driver_phone, "514-555-0199");
        assert_eq!(snapshot.vehicle_plate, "ABC-123");
    }

    #[test]
    fn test_completion_increments_and_releases() {
        let driver = driver_fixture(OperationalStatus::Busy);

        let active = OfferService::complete_delivery(&driver);
        assert_eq!(active.total_deliveries.clone().unwrap(), 5);
        assert_eq!(active.status.clone().unwrap(), OperationalStatus::Available);
    }

    #[test]
    fn test_release_is_unconditional_and_does_not_increment() {
        for status in [
            OperationalStatus::Busy,
            OperationalStatus::Offline,
            OperationalStatus::Available,
        ] {
            let driver = driver_fixture(status);
            let active = OfferService::release_driver(&driver);
            assert_eq!(active.status.clone().unwrap(), OperationalStatus::Available);
            assert!(!active.total_deliveries.is_set());
        }
    }

    #[tokio::test]
    async fn test_accept_requires_available_driver() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let driver = driver_fixture(OperationalStatus::Busy);

        let err = OfferService::accept_offer(&db, &driver, 7).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("available")));
    }

    #[tokio::test]
    async fn test_accept_loses_race_when_offer_already_assigned() {
        // Le UPDATE conditionnel ne touche aucune ligne (un autre driver a
        // gagné la course), le diagnostic retrouve l'offre déjà assignée
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![offer_fixture(OfferStatus::Matched, Some(99))]])
            .into_connection();
        let driver = driver_fixture(OperationalStatus::Available);

        let err = OfferService::accept_offer(&db, &driver, 7).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("already assigned")));
    }

    #[tokio::test]
    async fn test_accept_missing_offer_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<offers::Model>::new()])
            .into_connection();
        let driver = driver_fixture(OperationalStatus::Available);

        let err = OfferService::accept_offer(&db, &driver, 404).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_accept_wins_race_and_marks_driver_busy() {
        let mut assigned = offer_fixture(OfferStatus::Matched, Some(3));
        assigned.driver_first_name = Some("Marc".to_string());

        let busy = driver_fixture(OperationalStatus::Busy);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![busy]])
            .append_query_results([vec![assigned]])
            .into_connection();
        let driver = driver_fixture(OperationalStatus::Available);

        let offer = OfferService::accept_offer(&db, &driver, 7).await.unwrap();
        assert_eq!(offer.status, OfferStatus::Matched);
        assert_eq!(offer.driver_id, Some(3));
        assert_eq!(offer.driver_first_name.as_deref(), Some("Marc"));
    }

    #[tokio::test]
    async fn test_update_status_rejects_completing_a_matched_offer() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_fixture(OfferStatus::Matched, Some(3))]])
            .into_connection();
        let driver = driver_fixture(OperationalStatus::Busy);

        let err = OfferService::update_status(&db, &driver, 7, "completed")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("in-progress")));
    }

    #[tokio::test]
    async fn test_update_status_rejects_unknown_status() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let driver = driver_fixture(OperationalStatus::Busy);

        let err = OfferService::update_status(&db, &driver, 7, "delivered")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
