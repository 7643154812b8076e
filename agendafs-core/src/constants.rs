/// X- property marking a record as a directory
pub const IS_DIRECTORY_PROPERTY: &str = "X-CALDAVFS-ISDIRECTORY";

pub const DIRECTORY_MARKER_VALUE: &str = "YES";

/// X- property overriding the default file extension
pub const FILE_EXTENSION_PROPERTY: &str = "X-CALDAVFS-FILEEXT";

/// Empty values read back as absent, so an explicit empty extension is
/// stored as a disallowed one.
pub const EMPTY_EXTENSION_SENTINEL: &str = ".";

/// Prefix of X- properties holding custom attributes
pub const CUSTOM_PROPERTY_PREFIX: &str = "X-CALDAVFS-CUSTOM-";

/// Appended to generated uids
pub const UID_SUFFIX: &str = "-agendafs";

pub const PRODID: &str = "-//agendafs//EN";

/// Extension given to files whose record has no override
pub const DEFAULT_FILE_EXTENSION: &str = "txt";

/// Prefix the host adapter puts in front of attribute names
pub const XATTR_PREFIX: &str = "user.";

/// xattr(7) limits
pub const MAX_ATTRIBUTE_NAME_LEN: usize = 255;
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 64 * 1024 - 1;

/// Delay before the watcher retries a record it could not read
pub const WATCH_RETRY_DELAY_MS: u64 = 100;
pub const WATCH_MAX_RETRIES: u32 = 5;

/// Permission bits shown for files
pub const FILE_PERMISSIONS: u16 = 0o774;

/// Permission bits shown for directories, including the root
pub const DIRECTORY_PERMISSIONS: u16 = 0o444;
