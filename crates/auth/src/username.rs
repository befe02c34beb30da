/// Characters that can never appear in a canonical username. These collide
/// with the host's markup and title syntax.
const FORBIDDEN: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}', '/'];

/// Normalize a username into the canonical form that keys all identity
/// state: trimmed, underscores read as spaces, interior whitespace
/// collapsed. Returns `None` when no valid canonical form exists, in which
/// case the attempt abstains before touching the network.
pub fn canonicalize(username: &str) -> Option<String> {
    let spaced = username.replace('_', " ");
    let canonical = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if canonical.is_empty() {
        return None;
    }

    if canonical.chars().any(|c| c.is_control() || FORBIDDEN.contains(&c)) {
        return None;
    }

    Some(canonical)
}
