pub mod application;
pub mod company;
pub mod referral;
pub mod status_column;
pub mod status_history;
pub mod study_problem;
