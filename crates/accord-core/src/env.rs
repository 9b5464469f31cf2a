//! Environment flags shared by the server and client configurations.

/// Whether the environment variable `var` holds an enabled flag.
///
/// Unset variables are off.
pub fn env_flag(var: &str) -> bool {
    std::env::var(var)
        .map(|raw| parse_flag(&raw))
        .unwrap_or(false)
}

/// `1` or `true` (any case, surrounding whitespace ignored) enables a flag;
/// anything else leaves it off.
pub fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    raw == "1" || raw.eq_ignore_ascii_case("true")
}
