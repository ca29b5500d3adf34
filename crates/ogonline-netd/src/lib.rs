//! TCP transport and a headless host/client for ogonline sessions.
//!
//! - [`net`]: Framing and the tokio-backed [`TcpTransport`]
//! - [`headless`]: Runs a session against an in-memory scene, for dedicated hosts and bots

pub mod headless;
pub mod net;

pub use headless::Headless;
pub use net::tcp::TcpTransport;
