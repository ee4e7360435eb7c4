pub mod subscribe;

pub use subscribe::{NextFn, SubscriberId, SubscriberSet, Unsubscribe};
