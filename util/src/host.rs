//! Host platform (linux for example) utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the software checkout.
///
/// Parameter files are read from `$THR_SW_ROOT/params` and sessions are
/// created under `$THR_SW_ROOT/sessions`.
pub const SW_ROOT_ENV_VAR: &str = "THR_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get the name of the machine we're running on, or `None` if it can't be
/// determined.
pub fn get_hostname() -> Option<String> {
    match std::fs::read_to_string("/etc/hostname") {
        Ok(s) => Some(s.trim().to_string()),
        Err(_) => env::var("HOSTNAME").ok()
    }
}
