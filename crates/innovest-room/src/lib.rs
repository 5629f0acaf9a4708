//! Deal-room orchestration on top of the REST and chat layers.
//!
//! - [`access::AccessMachine`] mirrors one investor's access request and
//!   validates every action locally before asking the server.
//! - [`room::DealRoom`] sequences the unlock flow and owns the room's
//!   conversation channel.
//! - [`mandate::InterestDesk`] and [`inbox::Inbox`] cover the secondary
//!   flows that share the same shapes.

pub mod access;
pub mod error;
pub mod inbox;
pub mod mandate;
pub mod room;

pub use access::{AccessMachine, Effect, Stage};
pub use error::{Banner, RoomError};
pub use inbox::{Conversation, Inbox, InnovatorInbox, InvestorInbox, inbox_for};
pub use mandate::InterestDesk;
pub use room::{Affordance, DealRoom, Marketplace, Navigator};
