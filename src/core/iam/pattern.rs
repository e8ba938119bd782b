//! Pattern matching for IAM resource ARNs
//!
//! Follows IAM resource-matching rules:
//! - `*` - Matches any run of characters, including `/` (e.g., `arn:aws:s3:::bucket/*`)
//! - `?` - Matches exactly one character
//!
//! Matching is case-sensitive.

/// Pattern matcher for resource ARNs
pub struct PatternMatcher;

impl PatternMatcher {
    /// Check if a resource ARN matches a pattern
    ///
    /// # Examples
    /// ```
    /// use s3_exchange_stack::iam::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("arn:aws:s3:::inbox/*", "arn:aws:s3:::inbox/a/b.csv"));
    /// assert!(PatternMatcher::matches("arn:aws:s3:::*", "arn:aws:s3:::inbox"));
    /// assert!(!PatternMatcher::matches("arn:aws:s3:::inbox/*", "arn:aws:s3:::inbox"));
    /// ```
    pub fn matches(pattern: &str, resource: &str) -> bool {
        // Exact match
        if pattern == resource {
            return true;
        }

        if !pattern.contains(['*', '?']) {
            return false;
        }

        let pattern: Vec<char> = pattern.chars().collect();
        let resource: Vec<char> = resource.chars().collect();
        Self::match_glob(&pattern, &resource)
    }

    /// Iterative glob match with single-star backtracking
    fn match_glob(pattern: &[char], text: &[char]) -> bool {
        let (mut p, mut t) = (0, 0);
        // Position of the last `*` seen and the text index it was tried at
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            if p < pattern.len() && pattern[p] == '*' {
                star = Some((p, t));
                p += 1;
            } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
                p += 1;
                t += 1;
            } else if let Some((star_p, star_t)) = star {
                // Let the last `*` swallow one more character
                p = star_p + 1;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            } else {
                return false;
            }
        }

        // Text exhausted - only trailing stars may remain
        pattern[p..].iter().all(|&c| c == '*')
    }
}
