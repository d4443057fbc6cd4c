pub mod message_dispatcher;
pub mod seed_messages;
pub mod send_batch_job;
