use std::fmt;

use secrecy::{ExposeSecret, Secret};

/// Opaque bearer credential. Redacted in `Debug`, compared in constant time.
pub struct Credential(Secret<String>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        safe_equal(self.expose(), other.expose())
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_token() {
        let c = Credential::new("super-secret");
        assert!(!format!("{c:?}").contains("super-secret"));
    }

    #[test]
    fn equality_and_clone() {
        let a = Credential::new("t1");
        assert_eq!(a, a.clone());
        assert_ne!(a, Credential::new("t2"));
        assert_ne!(a, Credential::new("t10"));
        assert!(Credential::new(" ").is_empty());
    }
}
