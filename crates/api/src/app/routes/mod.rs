use axum::{routing::get, Router};

pub mod access;
pub mod bases;
pub mod catalog;
pub mod inventory;
pub mod purchases;
pub mod sales;
pub mod settings;
pub mod stats;
pub mod system;
pub mod uploads;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/bases", bases::bases_router())
        .nest("/sub-districts", bases::sub_districts_router())
        .nest("/locations", bases::locations_router())
        .nest("/personnel", bases::personnel_router())
        .nest("/warehouse-keepers", bases::keepers_router())
        .nest("/goods", catalog::goods_router())
        .nest("/parties", catalog::parties_router())
        .nest("/points", sales::points_router())
        .nest("/visits", sales::visits_router())
        .nest("/point-orders", sales::point_orders_router())
        .nest("/sales", sales::distribution_router())
        .nest("/purchases", purchases::orders_router())
        .nest("/arrivals", purchases::arrivals_router())
        .nest("/payables", purchases::payables_router())
        .nest("/inventory", inventory::router())
        .nest("/stock-outs", inventory::stock_outs_router())
        .nest("/currency-rates", settings::rates_router())
        .nest("/settings", settings::settings_router())
        .nest("/translations", settings::translations_router())
        .nest("/roles", access::roles_router())
        .nest("/users", access::users_router())
        .nest("/stats", stats::router())
        .merge(uploads::router())
}
