use sha2::{Digest, Sha256};

/// Gravatar URL for `email`, keyed by the SHA-256 of the trimmed, lowercased address.
pub fn url(email: &str, default: &str, rating: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    let hash = hex::encode(hasher.finalize());

    format!(
        "https://www.gravatar.com/avatar/{}?d={}&r={}",
        hash,
        urlencoding::encode(default),
        urlencoding::encode(rating)
    )
}
