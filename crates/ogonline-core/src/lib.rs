//! Multiplayer session core.
//!
//! This crate runs one host or client session over any [`Transport`]:
//!
//! - [`online`]: The main-thread facade (`Online`) that games drive each frame
//! - [`worker`]: The network worker that moves packages between queues and the transport
//! - [`connection_state`] / [`connection_manager`]: Host-side admission of joining clients
//! - [`registry`] / [`handlers`]: Per-message execution on arrival
//! - [`scene`]: The world interface handlers act on, plus an in-memory scene
//! - [`interpolator`]: Pacing of buffered movement frames
//! - [`transport`]: The transport trait and an in-process implementation

pub mod chat;
pub mod config;
pub mod connection_manager;
pub mod connection_state;
pub mod error;
pub mod handlers;
pub mod id_translation;
pub mod interpolator;
pub mod message_ref;
pub mod online;
pub mod peer;
pub mod queues;
pub mod registry;
pub mod scene;
pub mod session;
pub mod transport;
pub mod utility;
pub mod worker;

pub use config::{ModInfo, OnlineConfig};
pub use connection_state::ConnectionState;
pub use error::{OnlineError, TransportError};
pub use id_translation::IdTranslation;
pub use message_ref::{OnlineMessageRef, WeakMessageRef};
pub use online::{MultiplayerMode, Online};
pub use registry::{ExecuteContext, Handler, HandlerRegistry};
pub use scene::SceneGraph;
pub use scene::memory::MemoryScene;
pub use transport::memory::{MemoryNetwork, MemoryTransport};
pub use transport::{ConnectionChange, ConnectionEvent, Transport};
