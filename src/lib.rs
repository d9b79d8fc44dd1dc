//! fanin: identity-addressed routing core
//!
//! The routing half of a request/reply fan-in socket: peers connect
//! under stable identities, inbound messages are interleaved fairly
//! across peers, and outbound messages are routed by an identity
//! address frame. Transports plug in at the channel boundary and own
//! all network I/O.

pub mod config;
pub mod dispatch;
pub mod identity;
pub mod message;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod table;
pub mod transport;

// Re-export identity types
pub use identity::{Identity, IdentityError, GENERATED_PREFIX, MAX_IDENTITY_LEN};

// Re-export config types
pub use config::{BuffersConfig, Config, ConfigError, DeliveryConfig, LimitsConfig, RouterConfig};

// Re-export message types
pub use message::{Frame, Message, MessageError};

// Re-export session and table types
pub use session::{PeerSession, SessionId, SessionStats};
pub use table::{PeerTable, TableError};

// Re-export scheduling and dispatch types
pub use dispatch::{dispatch, DispatchError, DispatchOutcome};
pub use scheduler::FairQueue;

// Re-export transport types
pub use transport::{
    event_channel, transmit_channel, ConnectAck, EventRx, EventTx, PeerEvent, Transmit,
    TransmitRx, TransmitTx,
};

// Re-export router types
pub use router::{
    ConnectError, RecvError, Router, RouterError, RouterHandle, RouterState,
};
