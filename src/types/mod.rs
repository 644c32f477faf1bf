mod agreement;
mod auth;
mod chat;
mod notifications;
mod provider;

pub use agreement::*;
pub use auth::*;
pub use chat::*;
pub use notifications::*;
pub use provider::*;
