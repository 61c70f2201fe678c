//! # Courier Transport
//!
//! Bus-side building blocks:
//!
//! | Type | Role |
//! |------|------|
//! | [`MemoryBus`] | In-process [`MessageBus`](courier_core::MessageBus) over tokio broadcast channels. |
//! | [`BusPublisher`] | [`ResponsePublisher`](courier_core::ResponsePublisher) writing responses to the reply stream. |
//! | [`RpcClient`] | Call-and-await on top of any bus, matching replies by correlation id. |

pub mod memory;
pub mod publisher;
pub mod rpc;

pub use memory::{DEFAULT_CHANNEL_CAPACITY, MAX_CHANNEL_CAPACITY, MemoryBus};
pub use publisher::BusPublisher;
pub use rpc::{DEFAULT_REPLY_STREAM, DEFAULT_REQUEST_STREAM, DEFAULT_TIMEOUT, RpcClient};
