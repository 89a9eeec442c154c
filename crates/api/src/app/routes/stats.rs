use axum::{extract::Query, response::Response, routing::get, Router};

use crate::app::dto::{BaseQuery, SalesStatsQuery};
use crate::app::errors::ServiceResult;
use crate::app::services::stats::STATS;
use crate::app::services::TenantServices;

pub fn router() -> Router {
    Router::new()
        .route("/overview", get(overview))
        .route("/sales", get(sales))
}

pub async fn overview(svc: TenantServices, Query(query): Query<BaseQuery>) -> ServiceResult<Response> {
    let overview = svc.overview(query.base_id).await?;
    svc.respond(STATS, &overview)
}

pub async fn sales(svc: TenantServices, Query(query): Query<SalesStatsQuery>) -> ServiceResult<Response> {
    let days = svc.sales_stats(query).await?;
    svc.respond(STATS, &days)
}
