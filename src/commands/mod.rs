pub mod attr;
pub mod file;
pub mod tree;
pub mod watch;

/// Read size used when printing whole files
pub const READ_CHUNK: usize = 64 * 1024;
