//! Redirect target allowlist matching.
//!
//! A pattern is an origin or URL prefix such as `https://app.example.com` or
//! `https://*.example.com/callback`. A target matches when it equals the
//! pattern or continues it at a `/`, `?` or `#` boundary, so
//! `https://app.example.com.evil.io` and `https://app.example.com@evil.io`
//! never match `https://app.example.com`. A `*` matches one or more
//! characters from `[A-Za-z0-9_-]`.

/// Returns true when `target` is covered by `pattern`.
pub fn matches(pattern: &str, target: &str) -> bool {
    let pattern = pattern.trim_end_matches('/');
    if pattern.is_empty() {
        return false;
    }
    match_from(pattern.as_bytes(), target.as_bytes())
}

fn match_from(pattern: &[u8], target: &[u8]) -> bool {
    match pattern.split_first() {
        None => is_boundary(target),
        Some((b'*', rest)) => {
            let run = target.iter().take_while(|c| is_label_char(**c)).count();
            (1..=run).any(|taken| match_from(rest, &target[taken..]))
        }
        Some((expected, rest)) => match target.split_first() {
            Some((actual, target_rest)) if actual == expected => match_from(rest, target_rest),
            _ => false,
        },
    }
}

fn is_boundary(rest: &[u8]) -> bool {
    matches!(rest.first(), None | Some(b'/') | Some(b'?') | Some(b'#'))
}

fn is_label_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches("http://localhost:3000", "http://localhost:3000"));
        assert!(matches("http://myapp", "http://myapp"));
    }

    #[test]
    fn test_trailing_slash_in_pattern_is_ignored() {
        assert!(matches("http://localhost:3000/", "http://localhost:3000"));
        assert!(matches("http://localhost:3000/", "http://localhost:3000/profile"));
    }

    #[test]
    fn test_path_query_and_fragment_continuations() {
        assert!(matches("http://localhost:3000", "http://localhost:3000/profile"));
        assert!(matches("http://localhost:3000", "http://localhost:3000?next=1"));
        assert!(matches("http://localhost:3000", "http://localhost:3000#done"));
        assert!(matches(
            "https://app.example.com/auth",
            "https://app.example.com/auth/callback"
        ));
    }

    #[test]
    fn test_rejects_lookalike_hosts() {
        assert!(!matches("http://localhost:3000", "http://localhost:30001"));
        assert!(!matches("https://app.example.com", "https://app.example.com.evil.io"));
        assert!(!matches("https://app.example.com", "https://app.example.com@evil.io"));
        assert!(!matches("https://app.example.com/auth", "https://app.example.com/authx"));
    }

    #[test]
    fn test_rejects_other_origins() {
        assert!(!matches("http://localhost:3000", "https://evil.com"));
        assert!(!matches("http://localhost:3000", "https://localhost:3000"));
        assert!(!matches("http://localhost:3000", ""));
    }

    #[test]
    fn test_wildcard_subdomain() {
        let pattern = "https://*.example.com";
        assert!(matches(pattern, "https://app.example.com"));
        assert!(matches(pattern, "https://my-app.example.com/path"));
        assert!(!matches(pattern, "https://example.com"));
        assert!(!matches(pattern, "https://a.b.example.com"));
        assert!(!matches(pattern, "https://evil.com/.example.com"));
    }

    #[test]
    fn test_wildcard_port() {
        assert!(matches("http://localhost:*", "http://localhost:5173/callback"));
        assert!(!matches("http://localhost:*", "http://localhost"));
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        assert!(!matches("", "http://localhost:3000"));
        assert!(!matches("/", "/"));
    }
}
