pub mod audio;
pub mod events;
pub mod initiation;
pub mod tools;

pub use events::{AgentEvent, ClientEvent};
pub use initiation::{ConversationInitiation, ConversationInitiationData};
