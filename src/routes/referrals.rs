use axum::{
    routing::{get, put},
    Router,
};
use crate::state::AppState;
use crate::handlers::referral;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/referrals", get(referral::referral_stats))
        .route(
            "/referrals/partners",
            get(referral::list_referral_partners).post(referral::create_referral_partner),
        )
        .route(
            "/referrals/partners/{id}",
            put(referral::update_referral_partner).delete(referral::delete_referral_partner),
        )
        .route("/referrals/{code}/customers", get(referral::list_referred_customers))
}
