pub mod health;
pub mod auth;
pub mod client;
pub mod driver;
pub mod admin;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(client::client_routes)
            .configure(driver::driver_routes)
            .configure(admin::admin_routes),
    );
}
