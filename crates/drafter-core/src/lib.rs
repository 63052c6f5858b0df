pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use backend::{ChatReply, DrafterApi, DrafterClient, Health};
pub use config::{Config, DocumentOrdering, Settings, Timing};
pub use driver::Driver;
pub use error::ApiError;
pub use session::SessionId;
pub use state::{
    Command, DocumentState, DraftState, Event, Message, MessageKind, ServerStatus, Transition,
};
