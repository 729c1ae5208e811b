pub mod engine;
pub mod message;
pub mod subscriber;
pub mod topic;

pub use engine::{Broker, FanOut};
pub use message::Message;
pub use subscriber::Subscriber;
pub use topic::SubscriberId;
