use rand::{Rng, distributions::Alphanumeric};

/// Length of opaque refresh and reset tokens. 32 alphanumeric characters
/// carry just over 190 bits of entropy.
pub const TOKEN_LENGTH: usize = 32;

/// Generates a random alphanumeric string of the specified length.
///
/// Backed by the thread-local CSPRNG; suitable for opaque credentials.
pub fn random_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_requested_length_and_charset() {
        let token = random_token(TOKEN_LENGTH);
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn successive_tokens_differ() {
        assert_ne!(random_token(TOKEN_LENGTH), random_token(TOKEN_LENGTH));
    }
}
