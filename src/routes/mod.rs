pub mod customers;
pub mod dashboard;
pub mod events;
pub mod excluded_emails;
pub mod partners;
pub mod referrals;
pub mod sync;
pub mod transactions;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(customers::routes())
        .merge(transactions::routes())
        .merge(events::routes())
        .merge(referrals::routes())
        .merge(partners::routes())
        .merge(excluded_emails::routes())
        .merge(dashboard::routes())
        .merge(sync::routes())
}
