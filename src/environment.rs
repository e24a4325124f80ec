use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Retrieves an environment variable and parses it, falling back to `default`.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `default`: Value used when the variable is unset, blank or unparsable.
///
/// # Returns
/// - The parsed value or `default`. Unparsable values are logged.
pub fn get_env_var_or<T>(var: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid value {:?} for {}; using {}", raw, var, default);
                default
            }
        },
        _ => default,
    }
}

/// Reads a boolean flag. Accepts `true/false`, `1/0`, `yes/no` and `on/off`.
pub fn get_env_var_as_bool(var: &str, default: bool) -> bool {
    let Ok(raw) = env::var(var) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        "" => default,
        _ => {
            warn!("Ignoring invalid value {:?} for {}; using {}", raw, var, default);
            default
        }
    }
}
