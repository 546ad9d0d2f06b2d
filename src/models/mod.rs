pub mod credit;
pub mod customer;
pub mod event;
pub mod excluded_email;
pub mod partner;
pub mod referral;
pub mod stats;
pub mod transaction;
