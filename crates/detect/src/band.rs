//! Photometric band identifiers.

use std::fmt;

/// Name of a photometric band (`"u"`, `"g"`, `"1"`, `"BP"`, ...).
///
/// Bands order lexically, which is the order used when an object's bands
/// are discovered dynamically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BandId(String);

impl BandId {
    /// Creates a band identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the band name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BandId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for BandId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Label of a band pair, `"a-b"`.
pub fn pair_label(a: &BandId, b: &BandId) -> String {
    format!("{a}-{b}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_and_order() {
        let (g, r) = (BandId::new("g"), BandId::from("r"));
        assert_eq!(pair_label(&g, &r), "g-r");
        assert!(g < r);
        assert_eq!(g.as_str(), "g");
        assert_eq!(BandId::from("1".to_string()).to_string(), "1");
    }
}
