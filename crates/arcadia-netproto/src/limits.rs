//! Size limits for inbound traffic.

/// Largest inbound text frame accepted by default (16 KB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024;

/// Hard ceiling for `--max-message-bytes`.
pub const MAX_MESSAGE_BYTES_CEILING: usize = 1024 * 1024;

/// Longest chat message, in characters.
pub const MAX_CHAT_CHARS: usize = 500;

/// Longest identity reference accepted by `auth`.
pub const MAX_IDENTITY_REF_LEN: usize = 512;

/// Longest room or game identifier accepted by `join_room`.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Clamp a configured message limit into the supported range.
#[inline]
pub const fn clamp_message_limit(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_MAX_MESSAGE_BYTES
    } else if requested > MAX_MESSAGE_BYTES_CEILING {
        MAX_MESSAGE_BYTES_CEILING
    } else {
        requested
    }
}
