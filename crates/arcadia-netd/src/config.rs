use arcadia_netproto::constants::{DEFAULT_GAME_ID, DEFAULT_ROOM_CAPACITY, DEFAULT_ROOM_ID};
use arcadia_netproto::limits::{DEFAULT_MAX_MESSAGE_BYTES, clamp_message_limit};

use crate::net::rate_limit::RateLimitConfig;

/// Outbound frames buffered per connection before broadcasts start dropping.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Server-wide settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum members per room.
    pub room_capacity: usize,
    /// Room joined when `join_room` names none.
    pub default_room_id: String,
    /// Game attached to rooms created without a `gameId`.
    pub default_game_id: String,
    /// Largest accepted inbound envelope, in bytes.
    pub max_message_bytes: usize,
    pub outbound_queue: usize,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room_capacity: DEFAULT_ROOM_CAPACITY,
            default_room_id: DEFAULT_ROOM_ID.to_string(),
            default_game_id: DEFAULT_GAME_ID.to_string(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Clamp values into supported ranges.
    pub fn normalized(mut self) -> Self {
        self.room_capacity = self.room_capacity.max(1);
        self.max_message_bytes = clamp_message_limit(self.max_message_bytes);
        self.outbound_queue = self.outbound_queue.max(1);
        self
    }
}
