pub mod credit;
pub mod customer;
pub mod dashboard;
pub mod event;
pub mod excluded_email;
pub mod partner;
pub mod referral;
pub mod sync;
pub mod transaction;
