//! WebSocket module for the chat relay
//!
//! Keeps the username → connection registry and runs one session per
//! connection, routing chat messages and typing notifications between users.

mod events;
mod history;
mod registry;
mod server;
mod session;

pub use events::{ChatMessage, InboundEvent, TypingEvent, TYPING_EVENT};
pub use history::{LoggedMessage, MessageLog};
pub use registry::{ConnectionHandle, ConnectionRegistry, Delivery};
pub use server::{ws_route, ChatSession};
pub use session::{Session, SessionState};
