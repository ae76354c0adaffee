pub mod frames;
pub mod registry;

pub use frames::{ClientFrame, ServerFrame, StopReason};
pub use registry::{ClientId, Registry, SubscriptionChange};
