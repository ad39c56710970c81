// src/integrations/mod.rs — Chat platform integration layer

pub mod slack;
pub mod types;

pub use slack::SlackAdapter;
pub use types::{ChannelHistory, RawMessage, ReplySink};
