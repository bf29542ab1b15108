pub mod activity;
pub mod user_detail;
pub mod users;
