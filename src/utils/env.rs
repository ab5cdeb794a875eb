// src/utils/env.rs - Environment bootstrap

use log::debug;

/// Load variables from a .env file if one is present. Missing files are
/// fine; the process environment always wins.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found, using process environment only"),
    }
}
