//! Path pattern matching logic.
//!
//! # Responsibilities
//! - Match request paths against cache-behavior glob patterns
//! - `*` matches any run of characters (including `/`)
//! - `?` matches exactly one character
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `*` alone is the catch-all (the default behavior's pattern)
//! - Two-pointer backtracking scan; no regex, O(n·m) worst case

/// A compiled cache-behavior path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    pattern: String,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The catch-all pattern bound to the default behavior.
    pub fn catch_all() -> Self {
        Self::new("*")
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns true if `path` matches this pattern. The query string must
    /// already be stripped by the caller.
    pub fn matches(&self, path: &str) -> bool {
        glob_match(self.pattern.as_bytes(), path.as_bytes())
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Iterative glob match with single-star backtracking.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            // Remember the star; try matching it against the empty run first.
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            // Backtrack: let the last star absorb one more character.
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}
