//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - invalid environment name or request
pub const VALIDATION_ERROR: i32 = 2;

/// The release does not exist
pub const NOT_FOUND: i32 = 3;

/// The release already exists or is busy with another operation
pub const CONFLICT: i32 = 4;

/// IO error - chart source, output directory, values file or cleanup
pub const IO_ERROR: i32 = 5;

/// The packaging backend failed
pub const BACKEND_ERROR: i32 = 6;

/// Configuration error - missing credentials or bad settings (sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
