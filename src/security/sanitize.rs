//! Text sanitization and input-shape checks.
//!
//! Everything a user types that is later rendered as content passes through
//! [`sanitize`] first: tags are stripped, surrounding whitespace trimmed, and
//! the remaining markup-significant characters escaped as entities.

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Neutralize markup in user-supplied text.
pub fn sanitize(text: &str) -> String {
    let stripped = TAG.replace_all(text, "");
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.trim().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Basic `local@domain.tld` shape check.
pub fn is_email_shaped(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Length in characters (not bytes).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Mask an email for logging: `ann@x.com` → `a***@x.com`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
