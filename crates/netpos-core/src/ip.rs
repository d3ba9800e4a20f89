//! Textual IP literal validation
//!
//! These checks are deliberately textual: they decide whether a string is an
//! acceptable literal, not what address it denotes. IPv4 groups must be in
//! canonical decimal form, so `010.0.0.1` is rejected rather than read as
//! octal or as `10.0.0.1`.

/// Maximum textual length of an IPv6 literal (`ffff:...:255.255.255.255`)
const MAX_IPV6_LEN: usize = 45;

/// Check for a dotted-quad IPv4 literal
///
/// Exactly four groups, each the canonical decimal rendering of a value in
/// `[0, 255]`.
pub fn is_valid_ipv4(s: &str) -> bool {
    let mut groups = 0;
    for group in s.split('.') {
        groups += 1;
        if groups > 4 || !is_canonical_octet(group) {
            return false;
        }
    }
    groups == 4
}

fn is_canonical_octet(group: &str) -> bool {
    if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match group.parse::<u16>() {
        Ok(value) => value <= 255 && value.to_string() == group,
        Err(_) => false,
    }
}

/// Check for a colon-hex IPv6 literal
///
/// Groups are 1–4 hex digits. At most one `::` may appear; without it there
/// must be exactly eight groups, with it at most seven explicit ones. A
/// trailing dotted IPv4 group is accepted and counts as two groups.
pub fn is_valid_ipv6(s: &str) -> bool {
    if s.len() < 2 || s.len() > MAX_IPV6_LEN || !s.contains(':') {
        return false;
    }

    match s.find("::") {
        Some(at) => {
            let head = &s[..at];
            let tail = &s[at + 2..];
            if tail.contains("::") {
                return false;
            }
            match (count_groups(head, false), count_groups(tail, true)) {
                (Some(h), Some(t)) => h + t <= 7,
                _ => false,
            }
        }
        None => count_groups(s, true) == Some(8),
    }
}

/// Count the groups of a `:`-separated run, or `None` if any group is invalid
fn count_groups(run: &str, allow_ipv4_tail: bool) -> Option<usize> {
    if run.is_empty() {
        return Some(0);
    }

    let parts: Vec<&str> = run.split(':').collect();
    let last = parts.len() - 1;
    let mut count = 0;

    for (i, part) in parts.iter().enumerate() {
        if i == last && allow_ipv4_tail && part.contains('.') {
            if !is_valid_ipv4(part) {
                return None;
            }
            count += 2;
        } else if is_hex_group(part) {
            count += 1;
        } else {
            return None;
        }
    }

    Some(count)
}

fn is_hex_group(part: &str) -> bool {
    (1..=4).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check for either an IPv4 or an IPv6 literal
pub fn is_valid_ip(s: &str) -> bool {
    is_valid_ipv4(s) || is_valid_ipv6(s)
}
