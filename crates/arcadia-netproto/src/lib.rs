pub mod codec;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod limits;
pub mod messages;
pub mod msg_type;
pub mod state;
