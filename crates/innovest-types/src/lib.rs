pub mod api;
pub mod events;
pub mod lifecycle;
pub mod models;

pub use lifecycle::{Decision, InterestStatus, TransitionError};
pub use models::{
    AccessRequest, AccessStatus, Deal, DealStatus, DocType, Document, Identity, Mandate,
    MandateInterest, MandateInterestStatus, Message, PrivateDeal, Role,
};
