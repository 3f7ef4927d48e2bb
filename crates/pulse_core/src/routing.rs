//! Event-name conventions shared by every bus user.

/// Leading characters that force an event onto the shared bus.
pub const DEFAULT_GLOBAL_MARKERS: [char; 3] = ['/', '#', '@'];

/// Check whether `name` starts with one of the global `markers`.
pub fn is_global_event(name: &str, markers: &[char]) -> bool {
    name.chars().next().is_some_and(|c| markers.contains(&c))
}

/// Split a combined update key (`"add,plus"`) into individual event names.
///
/// Surrounding whitespace is trimmed and empty segments are dropped.
pub fn split_event_names(key: &str) -> impl Iterator<Item = &str> {
    key.split(',').map(str::trim).filter(|name| !name.is_empty())
}
