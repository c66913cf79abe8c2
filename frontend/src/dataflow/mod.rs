//! Actor+Relay primitives.
//!
//! - **[`Relay`]** sends events into a domain
//! - **[`Actor`]** owns a domain's state and processes its events sequentially
//! - **[`ActorVec`]** same for a collection rendered item by item
//!
//! Relays follow the `{source}_{event}_relay` naming pattern.

pub mod actor;
pub mod actor_vec;
pub mod relay;

pub use actor::Actor;
pub use actor_vec::ActorVec;
pub use relay::{Relay, relay};
