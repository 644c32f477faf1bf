pub mod agreement;
pub mod conversation;
pub mod message;
pub mod provider;
pub mod review;

pub use agreement::Agreement;
pub use conversation::Conversation;
pub use message::Message;
pub use provider::Provider;
pub use review::Review;
