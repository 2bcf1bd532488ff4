pub mod auth;
pub mod user;

pub use user::{CompanySummary, ProfileUpdate, Role, UserProfile};
