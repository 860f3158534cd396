pub mod broadcast;
pub mod registry;
pub mod state;

pub use registry::RoomRegistry;
pub use state::{Departed, Joined, Member, Room, RoomError, RoomId};
