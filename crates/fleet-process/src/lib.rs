pub mod controller;
pub mod lifecycle;
pub mod signal;

pub use controller::{Controller, ControllerError, LifecycleEmitter, NullEmitter};
pub use lifecycle::{LifecycleEvent, StopReason};
pub use signal::Signal;
