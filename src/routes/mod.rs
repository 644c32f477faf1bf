pub mod agreements;
pub mod auth;
pub mod conversations;
pub mod messages;
pub mod notifications;
pub mod providers;
