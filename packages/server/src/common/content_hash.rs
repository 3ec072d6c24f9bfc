use sha2::{Digest, Sha256};

/// Generate a content fingerprint for duplicate detection
///
/// Uses SHA256 of normalized text to detect when two fetched items carry the
/// same content. Normalization rules:
/// - Convert to lowercase
/// - Remove all non-alphanumeric characters (except spaces)
/// - Collapse multiple spaces into single spaces
/// - Trim leading/trailing whitespace
///
/// This makes the fingerprint robust against minor formatting changes while
/// still detecting meaningful content changes.
pub fn content_fingerprint(text: &str) -> String {
    // Normalize text
    let normalized = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    // Generate SHA256 hash
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_same_fingerprint() {
        let text1 = "City council approves new shelter funding";
        let text2 = "City council approves new shelter funding";

        assert_eq!(content_fingerprint(text1), content_fingerprint(text2));
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let text1 = "City council approves new shelter funding!";
        let text2 = "CITY COUNCIL APPROVES NEW SHELTER FUNDING";
        let text3 = "city  council approves   new shelter funding";

        let hash1 = content_fingerprint(text1);
        let hash2 = content_fingerprint(text2);
        let hash3 = content_fingerprint(text3);

        assert_eq!(hash1, hash2);
        assert_eq!(hash2, hash3);
    }

    #[test]
    fn different_content_different_fingerprint() {
        assert_ne!(
            content_fingerprint("shelter funding approved"),
            content_fingerprint("shelter funding rejected")
        );
    }
}
