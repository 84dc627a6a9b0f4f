//! At-rest encryption for imported GitHub tokens.

// SECURITY: These are HKDF domain-separation parameters (salt and info), NOT secret keys.
// They ensure the derived encryption key is unique to the "GitHub token" use-case.
// The actual secret input to HKDF comes from the MODHOST_TOKEN_SECRET environment variable.
const HKDF_SALT: &[u8] = b"modhost-copilot-metrics";
const HKDF_INFO: &[u8] = b"github-token";

/// Encrypt a GitHub token for storage.
///
/// The encryption key is derived from `secret` via HKDF-SHA256.
/// Returns base64-encoded `nonce || ciphertext`.
pub fn encrypt_token(token: &str, secret: &str) -> Result<String, String> {
    use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
    use hkdf::Hkdf;
    use sha2::Sha256;

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret.as_bytes());
    let mut derived = [0u8; 32];
    hk.expand(HKDF_INFO, &mut derived)
        .map_err(|e| format!("HKDF expand failed: {e}"))?;

    let cipher =
        Aes256Gcm::new_from_slice(&derived).map_err(|e| format!("AES-GCM key init failed: {e}"))?;

    let nonce_bytes: [u8; 12] = rand::random();
    #[allow(deprecated)]
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, token.as_bytes())
        .map_err(|e| format!("Encryption failed: {e}"))?;

    let mut combined = Vec::with_capacity(12 + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    use base64::Engine;
    Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
}

/// Decrypt a stored GitHub token.
pub fn decrypt_token(encrypted: &str, secret: &str) -> Result<String, String> {
    use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
    use hkdf::Hkdf;
    use sha2::Sha256;

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret.as_bytes());
    let mut derived = [0u8; 32];
    hk.expand(HKDF_INFO, &mut derived)
        .map_err(|e| format!("HKDF expand failed: {e}"))?;

    let cipher =
        Aes256Gcm::new_from_slice(&derived).map_err(|e| format!("AES-GCM key init failed: {e}"))?;

    use base64::Engine;
    let combined = base64::engine::general_purpose::STANDARD
        .decode(encrypted)
        .map_err(|e| format!("Base64 decode failed: {e}"))?;

    if combined.len() < 12 {
        return Err("Ciphertext too short".to_string());
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    #[allow(deprecated)]
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| format!("Decryption failed: {e}"))?;

    String::from_utf8(plaintext).map_err(|e| format!("UTF-8 decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_token() {
        let token = "ghp_exampletoken1234567890";
        let secret = "my-token-secret-for-testing";

        let encrypted = encrypt_token(token, secret).unwrap();
        assert_ne!(encrypted, token); // Must be different

        let decrypted = decrypt_token(&encrypted, secret).unwrap();
        assert_eq!(decrypted, token);
    }

    #[test]
    fn test_decrypt_wrong_secret_fails() {
        let encrypted = encrypt_token("ghp_token", "correct-secret").unwrap();
        let result = decrypt_token(&encrypted, "wrong-secret");
        assert!(result.is_err());
    }

    #[test]
    fn test_nonce_makes_ciphertext_unique() {
        let a = encrypt_token("ghp_token", "secret").unwrap();
        let b = encrypt_token("ghp_token", "secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_truncated_input_fails() {
        use base64::Engine;
        let short = base64::engine::general_purpose::STANDARD.encode([0u8; 4]);
        assert!(decrypt_token(&short, "secret").is_err());
        assert!(decrypt_token("not base64!!", "secret").is_err());
    }
}
