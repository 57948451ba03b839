mod base;

pub use base::{EventBus, EventHost, HostEvent};
