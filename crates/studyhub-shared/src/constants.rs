/// Default REST backend base URL (local development server)
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Comments tab refresh interval in seconds
pub const COMMENT_POLL_SECS: u64 = 10;

/// How long a transient notification stays on screen, in milliseconds
pub const NOTICE_TTL_MS: u64 = 2_500;

/// Display name used when no user is logged in
pub const GUEST_NAME: &str = "Guest";

/// Key-value store keys for the durable local counters
pub const KEY_LAST_LOGIN: &str = "last_login";
pub const KEY_STREAK_COUNT: &str = "streak_count";
pub const KEY_PLANT_GROWTH: &str = "plant_growth";
