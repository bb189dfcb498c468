pub mod credentials;
pub mod traits;

// Broker client implementations
pub mod kis;
