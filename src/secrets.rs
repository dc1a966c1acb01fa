use rand::RngCore;

/// Byte length of the setup password handed to the end user (32 hex chars).
pub const SETUP_PASSWORD_BYTES: usize = 16;
/// Byte length of the internal gateway token. Never exposed to the user.
pub const GATEWAY_TOKEN_BYTES: usize = 32;

/// Generates a hex-encoded secret of `byte_len` random bytes.
///
/// `rand::rng()` is a CSPRNG; predictable output here would let anyone
/// administer a deployed instance. Entropy-source failure aborts the process.
pub fn generate_secret(byte_len: usize) -> String {
    let mut buf = vec![0u8; byte_len];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_length_is_twice_byte_len() {
        assert_eq!(generate_secret(16).len(), 32);
        assert_eq!(generate_secret(32).len(), 64);
    }

    #[test]
    fn test_secret_is_lowercase_hex() {
        let secret = generate_secret(SETUP_PASSWORD_BYTES);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_secrets_are_unique() {
        let a = generate_secret(GATEWAY_TOKEN_BYTES);
        let b = generate_secret(GATEWAY_TOKEN_BYTES);
        assert_ne!(a, b);
    }
}
