// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - enums : Enums partagés (rôles, statuts d'offre/approbation/disponibilité)
//   - users : Comptes (clients, drivers, admins) + workflow d'approbation
//   - drivers : Profils drivers (licence, véhicule, disponibilité)
//   - offers : Offres de livraison (machine à états + snapshot driver)
//   - email_verification_tokens : Tokens de vérification email (expire 24h)
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les tables ont le suffixe "_rust" pour coexister avec Python
//   - Les relations entre tables sont définies dans chaque modèle
//
// ============================================================================

pub mod enums;
pub mod users;
pub mod drivers;
pub mod offers;
pub mod email_verification_tokens;
pub mod dto;
