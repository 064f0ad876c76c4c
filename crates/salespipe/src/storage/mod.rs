pub mod lifecycle;

pub use lifecycle::{FileClaim, LifecycleManager, Zone};
