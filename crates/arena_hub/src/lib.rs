//! Real-time fan-out of chat and game events to the clients of a session.
//!
//! # Architecture
//!
//! - **Message**: flat JSON envelope keyed by `type`
//! - **Hub**: single control loop owning the session registry; [`HubHandle`]
//!   sends it events and answers point queries
//! - **Client**: one connection, with a bounded outbound queue drained by a
//!   write task and an inbound read task dispatching through the hub
//! - **Transport**: frame-level connection traits, with an in-memory
//!   implementation for tests
//! - **MoveArbiter**: optional hook letting the game validate moves before
//!   they are broadcast
//!
//! A client whose queue is full when a broadcast arrives is dropped rather
//! than waited on.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod arbiter;
mod client;
mod config;
mod error;
mod hub;
mod message;
mod transport;

pub use arbiter::{MoveArbiter, MoveVerdict};
pub use client::{Client, ClientHandle, ClientId, ClientInfo, ClientQueue, ClientRef};
pub use config::HubConfig;
pub use error::{HubConfigError, HubError, ProtocolError, TransportError};
pub use hub::{Hub, HubHandle, SessionId};
pub use message::{ErrorCode, Message, MessageKind, MessageType, SYSTEM_USERNAME};
pub use transport::{
    Frame, FrameSink, FrameStream, MemoryPeer, MemorySink, MemoryStream, MemoryTransport,
    Transport,
};
