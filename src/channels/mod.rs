//! Slack transport: Web API client, Events API endpoint and the
//! collaborator traits the rest of the relay depends on.

pub mod events;
pub mod signature;
pub mod slack;
pub mod traits;
pub mod webhook;

pub use slack::SlackClient;
pub use traits::{ChannelPublisher, FileDownloader, LogStore};
pub use webhook::{EventsState, events_routes};
