pub mod user_service;
pub mod driver_service;
pub mod offer_service;
pub mod report_service;
