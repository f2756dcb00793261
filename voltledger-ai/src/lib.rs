pub mod models;
pub mod prompt;
pub mod provider;

pub use models::ProviderConfig;
pub use provider::OpenAiChatBackend;
