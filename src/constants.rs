// Reframe Manager Constants
// Filename conventions are shared with the external Player app. Do not change
// without checking what the Player writes and expects.

// File extensions (case-sensitive, as written by the camera)
pub const EXT_HIGH_DEF: &str = "360";
pub const EXT_LOW_DEF: &str = "LRV";
pub const EXT_PREVIEW: &str = "THM";
pub const EXT_REFRAME: &str = "reframe";
pub const EXT_BACKUP: &str = "BACKUP";

// Reframe / video name rules
pub const MAX_NAME_LENGTH: usize = 50;
pub const FORBIDDEN_NAME_CHARS: [char; 12] = [
    '/', '\\', '.', '@', '"', '\'', '~', '|', '$', '%', '*', '?',
];

// Automatic naming
pub const DEFAULT_REFRAME_NAME: &str = "Unknown";
pub const AUTO_NAME_CAP: u32 = 10_000_000;

// Player staging slot: "<yyyy-MM-dd-HH-mm-ss-000+hhmm>-<size>.reframe"
pub const SLOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-000%z";
pub const SLOT_NAME_PATTERN: &str =
    r"^(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}-000[+-]\d{4})-(\d+)\.reframe(\.BACKUP)?$";

// Hashing
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB

// Temp files written during cross-volume moves
pub const TEMP_FILE_PREFIX: &str = ".reframe_tmp_";

// App settings store
pub const APP_DB_DIR: &str = ".reframe-manager";
pub const APP_DB_FILENAME: &str = "app.db";

// Settings keys
pub const SETTING_WORKING_DIR: &str = "working_dir";
pub const SETTING_EDITOR_DIR: &str = "editor_dir";
pub const SETTING_EDITOR_COMMAND: &str = "editor_command";
pub const SETTING_LOG_LEVEL: &str = "log_level";

// Environment overrides (take precedence over stored settings)
pub const ENV_WORKING_DIR: &str = "REFRAME_WORKDIR";
pub const ENV_EDITOR_DIR: &str = "REFRAME_EDITOR_DIR";
