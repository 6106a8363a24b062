//! Exit code constants for the kbase CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, cancelled)
//! - 2: Validation failure (payload rules, duplicate natural key)
//! - 3: Store failure (database or lock directory unavailable)
//! - 4: Lock acquisition timed out
//! - 5: Access denied
//! - 6: Resource not found

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Validation failure: invalid payload or duplicate natural key.
pub const VALIDATION_FAILURE: i32 = 2;

/// Store failure: the database or lock store could not be used.
pub const STORE_FAILURE: i32 = 3;

/// Lock acquisition failure: creation lock held past the wait timeout.
pub const LOCK_FAILURE: i32 = 4;

/// The acting user does not own the resource.
pub const ACCESS_DENIED: i32 = 5;

/// The resource does not exist.
pub const NOT_FOUND: i32 = 6;
