/// API keys are 1..=`max_len` characters of `[A-Za-z0-9_\-.%]`.
pub fn is_api_key(key: &str, max_len: usize) -> bool {
    !key.is_empty()
        && key.len() <= max_len
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'%'))
}

/// An allow-list entry admits an address when it is `*` or a prefix of it,
/// so `10.0.` admits every `10.0.x.y` address. Blank entries admit nothing.
pub fn ip_matches(entry: &str, ip: &str) -> bool {
    let entry = entry.trim();
    entry == "*" || (!entry.is_empty() && ip.starts_with(entry))
}
