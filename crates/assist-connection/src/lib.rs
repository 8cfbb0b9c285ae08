//! # assist-connection
//!
//! One logical real-time connection to a per-user endpoint.
//!
//! - [`ConnectionManager`]: configure / connect / disconnect / send, with
//!   observable state, last frame, last error, and an event stream
//! - [`ReconnectState`]: bounded, fixed-delay reconnect bookkeeping
//! - [`Connector`]: the transport seam, with [`WsConnector`] over
//!   `tokio-tungstenite`

#![deny(unsafe_code)]

pub mod connector;
pub mod errors;
pub mod manager;
pub mod reconnect;
pub mod state;

pub use connector::{Connector, Incoming, Link, Outgoing, WsConnector};
pub use errors::{ConnectionError, TransportError};
pub use manager::ConnectionManager;
pub use reconnect::{ReconnectDecision, ReconnectState};
pub use state::{
    ABNORMAL_CLOSURE, ConnectionConfig, ConnectionEvent, ConnectionState,
    MANUAL_DISCONNECT_REASON, NORMAL_CLOSURE,
};
