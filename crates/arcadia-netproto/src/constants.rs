/// Room joined when a `join_room` message names no room.
pub const DEFAULT_ROOM_ID: &str = "default";

/// Game identifier used when a `join_room` message names no game.
pub const DEFAULT_GAME_ID: &str = "default";

/// Maximum number of concurrent members per room.
pub const DEFAULT_ROOM_CAPACITY: usize = 10;

/// Identifier of the task every fresh room starts with.
pub const TUTORIAL_TASK_ID: &str = "tutorial";

/// Credential type used when a credential reward does not name one.
pub const DEFAULT_CREDENTIAL_TYPE: &str = "AchievementCredential";

/// Experience needed per level.
pub const EXPERIENCE_PER_LEVEL: u32 = 100;

/// Starting health for a new session.
pub const DEFAULT_MAX_HEALTH: u32 = 100;
