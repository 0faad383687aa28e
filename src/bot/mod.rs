/// Inline button payload codec
pub mod callback;
/// Command, message and callback handlers
pub mod handlers;
/// Telegram sends with retry
pub mod resilient;
/// Dispatcher setup and runtime entrypoint
pub mod runner;
/// Outbound chat operations
pub mod transport;
/// Unauthorized access flood protection
pub mod unauthorized_cache;
/// Result rendering and user-facing texts
pub mod views;

pub use unauthorized_cache::UnauthorizedCache;
