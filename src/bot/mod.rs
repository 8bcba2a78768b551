/// Command and mini-app data handlers
pub mod handlers;
/// Outbound messaging abstraction over `teloxide::Bot`
pub mod messenger;

pub use messenger::{DeliveryError, Messenger, TextFormat};
