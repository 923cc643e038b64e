// ============================================================================
// REPORT SERVICE - RAPPORT DE TRIPS (lecture seule)
// ============================================================================
//
// Projection pure sur l'historique des offres:
//   - filtre par plage de dates sur created_at (début inclus, fin exclue
//     après ajout d'un jour à end_date) et par statut ("all" = aucun filtre)
//   - totaux, moyennes et taux de complétion arrondis à 2 décimales
//   - résolution des noms d'affichage:
//       client  : company_name, sinon email
//       driver  : "prénom nom" du profil, sinon le snapshot de l'offre,
//                 sinon "Not Assigned"
//
// ============================================================================

use sea_orm::*;
use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::{HashMap, HashSet};

use crate::errors::ServiceError;
use crate::models::dto::{TripRow, TripsReportResponse, TripsSummary};
use crate::models::enums::OfferStatus;
use crate::models::{drivers, offers, users};

pub struct ReportService;

impl ReportService {
    pub async fn trips_report(
        db: &DatabaseConnection,
        start_date: Option<String>,
        end_date: Option<String>,
        status: Option<String>,
    ) -> Result<TripsReportResponse, ServiceError> {
        let mut query = offers::Entity::find();

        // 1. Plage de dates sur created_at
        if let Some(raw) = &start_date {
            let date = Self::parse_date(raw)?;
            query = query.filter(
                offers::Column::CreatedAt.gte(date.and_time(NaiveTime::MIN)),
            );
        }
        if let Some(raw) = &end_date {
            // Fin inclusive: on ajoute un jour et on compare en exclusif
            let date = Self::parse_date(raw)? + Duration::days(1);
            query = query.filter(
                offers::Column::CreatedAt.lt(date.and_time(NaiveTime::MIN)),
            );
        }

        // 2. Filtre de statut ("all" ou absent = tous)
        if let Some(raw) = &status {
            if raw != "all" {
                let wanted = OfferStatus::try_from_value(raw).map_err(|_| {
                    ServiceError::InvalidInput(format!("Invalid status filter: {}", raw))
                })?;
                query = query.filter(offers::Column::Status.eq(wanted));
            }
        }

        let offer_rows = query
            .order_by_desc(offers::Column::CreatedAt)
            .all(db)
            .await?;

        // 3. Charger les clients et drivers référencés pour les noms
        let client_ids: Vec<i32> = offer_rows.iter().map(|o| o.client_id).collect();
        let clients: HashMap<i32, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(client_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let driver_ids: Vec<i32> = offer_rows.iter().filter_map(|o| o.driver_id).collect();
        let driver_rows: HashMap<i32, drivers::Model> = drivers::Entity::find()
            .filter(drivers::Column::Id.is_in(driver_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        Ok(Self::build_report(&offer_rows, &clients, &driver_rows))
    }

    fn parse_date(raw: &str) -> Result<NaiveDate, ServiceError> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ServiceError::InvalidInput(format!("Invalid date: {}", raw)))
    }

    /// Agrégation pure, séparée du fetch pour être testable sans base
    pub fn build_report(
        offer_rows: &[offers::Model],
        clients: &HashMap<i32, users::Model>,
        driver_rows: &HashMap<i32, drivers::Model>,
    ) -> TripsReportResponse {
        let total = offer_rows.len() as u64;
        let total_mileage: f64 = offer_rows.iter().filter_map(|o| o.total_mileage).sum();
        let average_mileage = if total > 0 {
            total_mileage / total as f64
        } else {
            0.0
        };

        let mut status_counts: HashMap<String, u64> = HashMap::new();
        for offer in offer_rows {
            *status_counts.entry(offer.status.to_value()).or_insert(0) += 1;
        }
        let completed = status_counts
            .get(&OfferStatus::Completed.to_value())
            .copied()
            .unwrap_or(0);
        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let unique_drivers = offer_rows
            .iter()
            .filter_map(|o| o.driver_id)
            .collect::<HashSet<i32>>()
            .len() as u64;
        let unique_clients = offer_rows
            .iter()
            .map(|o| o.client_id)
            .collect::<HashSet<i32>>()
            .len() as u64;

        let trips = offer_rows
            .iter()
            .map(|offer| Self::build_trip_row(offer, clients, driver_rows))
            .collect();

        TripsReportResponse {
            summary: TripsSummary {
                total_trips: total,
                total_mileage: round2(total_mileage),
                average_mileage: round2(average_mileage),
                completed_trips: completed,
                completion_rate: round2(completion_rate),
                status_counts,
                unique_drivers,
                unique_clients,
            },
            trips,
        }
    }

    fn build_trip_row(
        offer: &offers::Model,
        clients: &HashMap<i32, users::Model>,
        driver_rows: &HashMap<i32, drivers::Model>,
    ) -> TripRow {
        let client_name = clients
            .get(&offer.client_id)
            .map(|u| u.company_name.clone().unwrap_or_else(|| u.email.clone()))
            .unwrap_or_else(|| "Unknown".to_string());

        let driver_name = offer
            .driver_id
            .and_then(|id| driver_rows.get(&id))
            .map(|d| format!("{} {}", d.first_name, d.last_name))
            .or_else(|| offer.driver_first_name.clone())
            .unwrap_or_else(|| "Not Assigned".to_string());

        let vehicle_info = match (&offer.vehicle_make, &offer.vehicle_model) {
            (Some(make), Some(model)) => match &offer.vehicle_plate {
                Some(plate) => format!("{} {} ({})", make, model, plate),
                None => format!("{} {}", make, model),
            },
            _ => "N/A".to_string(),
        };

        TripRow {
            id: offer.id,
            pickup_date: offer.pickup_date.clone(),
            pickup_time: offer.pickup_time.clone(),
            client_name,
            driver_name,
            vehicle_info,
            pickup_address: offer.pickup_address.clone(),
            dropoff_address: offer.dropoff_address.clone(),
            total_mileage: offer.total_mileage.unwrap_or(0.0),
            status: offer.status.clone(),
            description: offer.description.clone(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{ApprovalStatus, OperationalStatus, UserRole};

    fn offer_fixture(
        id: i32,
        status: OfferStatus,
        mileage: Option<f64>,
        driver_id: Option<i32>,
    ) -> offers::Model {
        offers::Model {
            id,
            client_id: 20,
            driver_id,
            company_representative: "Jane".to_string(),
            emergency_phone: "555-0100".to_string(),
            description: "Pallets".to_string(),
            pickup_date: "2025-06-01".to_string(),
            pickup_time: "09:00".to_string(),
            pickup_address: "1 Main St".to_string(),
            dropoff_address: "9 Oak Ave".to_string(),
            total_mileage: mileage,
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

    fn client_fixture(id: i32, company: Option<&str>) -> users::Model {
        users::Model {
            id,
            email: "client@example.com".to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Client,
            company_name: company.map(|c| c.to_string()),
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

    fn driver_fixture(id: i32) -> drivers::Model {
        drivers::Model {
            id,
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
            status: OperationalStatus::Available,
            rating: 5.0,
            total_deliveries: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_report_arithmetic() {
        // Mileages [10, 20, None], statuts [completed, cancelled, pending]
        let offer_rows = vec![
            offer_fixture(1, OfferStatus::Completed, Some(10.0), Some(3)),
            offer_fixture(2, OfferStatus::Cancelled, Some(20.0), Some(3)),
            offer_fixture(3, OfferStatus::Pending, None, None),
        ];
        let clients = HashMap::from([(20, client_fixture(20, Some("Transport Lavoie")))]);
        let driver_rows = HashMap::from([(3, driver_fixture(3))]);

        let report = ReportService::build_report(&offer_rows, &clients, &driver_rows);

        assert_eq!(report.summary.total_trips, 3);
        assert_eq!(report.summary.total_mileage, 30.0);
        assert_eq!(report.summary.average_mileage, 10.0);
        assert_eq!(report.summary.completed_trips, 1);
        assert_eq!(report.summary.completion_rate, 33.33);
        assert_eq!(report.summary.unique_drivers, 1);
        assert_eq!(report.summary.unique_clients, 1);
        assert_eq!(report.summary.status_counts.get("completed"), Some(&1));
        assert_eq!(report.summary.status_counts.get("pending"), Some(&1));
    }

    #[test]
    fn test_empty_report_has_zero_rates() {
        let report = ReportService::build_report(&[], &HashMap::new(), &HashMap::new());

        assert_eq!(report.summary.total_trips, 0);
        assert_eq!(report.summary.total_mileage, 0.0);
        assert_eq!(report.summary.average_mileage, 0.0);
        assert_eq!(report.summary.completion_rate, 0.0);
        assert!(report.trips.is_empty());
    }

    #[test]
    fn test_display_name_fallbacks() {
        // Client sans company_name → email; driver non résolu → snapshot;
        // pas de snapshot → "Not Assigned"
        let mut with_snapshot = offer_fixture(1, OfferStatus::Matched, None, Some(77));
        with_snapshot.driver_first_name = Some("Ghost".to_string());
        let unassigned = offer_fixture(2, OfferStatus::Pending, None, None);

        let offer_rows = vec![with_snapshot, unassigned];
        let clients = HashMap::from([(20, client_fixture(20, None))]);

        let report = ReportService::build_report(&offer_rows, &clients, &HashMap::new());

        assert_eq!(report.trips[0].client_name, "client@example.com");
        assert_eq!(report.trips[0].driver_name, "Ghost");
        assert_eq!(report.trips[0].vehicle_info, "N/A");
        assert_eq!(report.trips[1].driver_name, "Not Assigned");
    }

    #[test]
    fn test_resolved_driver_name_beats_snapshot() {
        let mut offer = offer_fixture(1, OfferStatus::InProgress, Some(5.0), Some(3));
        offer.driver_first_name = Some("Stale".to_string());
        offer.vehicle_make = Some("Ford".to_string());
        offer.vehicle_model = Some("Transit".to_string());
        offer.vehicle_plate = Some("ABC-123".to_string());

        let report = ReportService::build_report(
            &[offer],
            &HashMap::new(),
            &HashMap::from([(3, driver_fixture(3))]),
        );

        assert_eq!(report.trips[0].driver_name, "Marc Tremblay");
        assert_eq!(report.trips[0].vehicle_info, "Ford Transit (ABC-123)");
    }
}
