use std::fmt;

/// Length of the hex prefix we keep from the full blake3 digest.
/// 64 bits is far past the point where collisions matter for the
/// handful of configurations a pipeline sees, and keeps filenames short.
const HEX_LEN: usize = 16;

/// Deterministic short identifier derived from a task's logical configuration.
///
/// Artifact filenames are `<fingerprint>.<ext>`, so a task's output path is a
/// pure function of its configuration, and the existence of that path is the
/// cache-hit signal. Equal component lists always produce equal fingerprints,
/// in-process and across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash an ordered list of string components.
    pub fn of<S: AsRef<str>>(parts: &[S]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part.as_ref().as_bytes());
            // length-prefix free separator, so ["ab", "c"] != ["a", "bc"]:
            hasher.update(&[0]);
        }
        let hex = hasher.finalize().to_hex();
        Self(hex[..HEX_LEN].to_owned())
    }

    /// Use a filename-safe parameter value directly, e.g. a calendar date.
    pub fn literal(value: &str) -> Self {
        debug_assert!(
            value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"-_.".contains(&b)),
            "fingerprint literal must be filename-safe: {value:?}",
        );
        Self(value.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_inputs_equal_fingerprints() {
        let a = Fingerprint::of(&["https://example.com/dump.zst", "2022-02-02"]);
        let b = Fingerprint::of(&["https://example.com/dump.zst", "2022-02-02"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), HEX_LEN);
    }

    #[test]
    fn test_component_boundaries_are_significant() {
        assert_ne!(Fingerprint::of(&["ab", "c"]), Fingerprint::of(&["a", "bc"]));
        assert_ne!(Fingerprint::of(&["ab"]), Fingerprint::of(&["ab", ""]));
    }

    #[test]
    fn test_no_collisions_in_large_sample() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for i in 0..10_000 {
            let fp = Fingerprint::of(&[format!("input-{i}")]);
            assert!(seen.insert(fp.as_str().to_owned()), "collision at {i}");
        }
    }

    #[test]
    fn test_literal_is_used_verbatim() {
        let fp = Fingerprint::literal("2022-02-02");
        assert_eq!(fp.as_str(), "2022-02-02");
        assert_eq!(fp.to_string(), "2022-02-02");
    }
}
