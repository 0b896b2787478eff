//! Data model for Lobbyforge.
//!
//! This crate defines the values that cross the boundary between the
//! client and the hosted lobby/relay services:
//!
//! - **Types** ([`LobbySnapshot`], [`PlayerId`], [`LobbyId`]): what a lobby
//!   looks like when the directory returns it.
//! - **Metadata** ([`keys`], [`MetadataEntry`], [`Visibility`]): the
//!   string key/value schema peers use to signal session start.
//! - **Requests** ([`CreateLobbyRequest`], [`LobbyPatch`], [`LobbyQuery`]):
//!   what the client sends.
//! - **Relay** ([`RelayAllocation`], [`RelayServerData`]): descriptors
//!   passed from the relay service to the transport.
//!
//! # Architecture
//!
//! ```text
//! Remote services (lobby, relay, transport) → Protocol (values) → Reconciler / Coordinator
//! ```
//!
//! The crate has no behaviour beyond small accessors; it doesn't know how
//! values travel on the wire.

mod metadata;
mod relay;
mod request;
mod types;

pub use metadata::{
    bool_flag, keys, Metadata, MetadataEntry, Visibility, NOT_STARTED, STARTED,
};
pub use relay::{AllocationId, RelayAllocation, RelayServerData, Region};
pub use request::{
    CreateLobbyRequest, JoinLobbyRequest, LobbyPatch, LobbyQuery, QueryFilter,
    QueryOrder,
};
pub use types::{LobbyId, LobbyPlayer, LobbySnapshot, PlayerId};
