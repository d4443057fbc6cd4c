pub mod message;

pub use message::{DeliveryRecord, Message, SendReceipt, validate_recipient};
