// ============================================================================
// Configuration Constants
// ============================================================================

// Default port value
pub(crate) const DEFAULT_PORT: u16 = 8000;

// Connection pool defaults
pub(crate) const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub(crate) const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 600;

// Message lifetime defaults (in days)
pub(crate) const DEFAULT_MESSAGE_EXPIRY_DAYS: i64 = 7;
pub(crate) const DEFAULT_MAX_EXPIRY_DAYS: i64 = 365;
// Ceiling for configured day counts; keeps timestamp arithmetic in range
pub(crate) const MAX_CONFIGURABLE_DAYS: i64 = 36_500;
// How long expired messages stay in history before cleanup may remove them
pub(crate) const DEFAULT_RETENTION_DAYS: i64 = 30;

// Push fan-out defaults
pub(crate) const DEFAULT_PUSH_CONCURRENCY: usize = 16;
pub(crate) const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 10;
pub(crate) const DEFAULT_PUSH_TITLE: &str = "New Message";
pub(crate) const DEFAULT_FCM_API_BASE: &str = "https://fcm.googleapis.com";

// Size limits
pub const MAX_MESSAGE_CONTENT_LENGTH: usize = 4096; // characters
pub const MAX_DEVICE_TOKEN_LENGTH: usize = 4096;
pub const MAX_PHONE_NUMBER_LENGTH: usize = 20;
pub const MAX_GROUP_NAME_LENGTH: usize = 255;
pub const MAX_CONTACT_NAME_LENGTH: usize = 255;
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024; // 2 MB - bulk imports
