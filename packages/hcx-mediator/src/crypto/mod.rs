//! JWE compact serialization (RFC 7516) with RSA-OAEP key wrap and
//! A256GCM content encryption — the exchange's mandated token format.
//!
//! Tokens travel as the five dot-separated base64url segments
//! `header.encrypted_key.iv.ciphertext.tag`. The protected header carries
//! the full protocol header set and is integrity-protected as the AAD.
//!
//! This module is pure: keys arrive as PEM strings, nothing here touches
//! the network.

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use aws_lc_rs::rsa::{
    OaepPrivateDecryptingKey, OaepPublicEncryptingKey, PrivateDecryptingKey, PublicEncryptingKey,
    OAEP_SHA1_MGF1SHA1,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivatePkcs8KeyDer, SubjectPublicKeyInfoDer};
use serde_json::Value;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::CryptoError;

/// JWE key-wrap algorithm pin. The `RSA-OAEP` alg of RFC 7518 is OAEP
/// with SHA-1 and MGF1-SHA1.
pub const JWE_ALG: &str = "RSA-OAEP";

/// JWE content-encryption algorithm pin.
pub const JWE_ENC: &str = "A256GCM";

const CEK_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// A decrypted token, both halves parsed.
#[derive(Clone, Debug)]
pub struct DecryptedEnvelope {
    /// The protected header set, as sent by the counterparty.
    pub headers: Value,
    /// The FHIR payload.
    pub payload: Value,
}

///
/// Encrypt `payload` to the holder of `recipient_public_key_pem`,
/// integrity-protecting `protected_headers` as the JWE protected header.
///
/// The recipient key may be an X.509 certificate (the registry serves
/// participant encryption certs) or a bare SubjectPublicKeyInfo PEM.
///
pub fn encrypt(
    recipient_public_key_pem: &str,
    payload: &Value,
    protected_headers: &Value,
) -> Result<String, CryptoError> {
    let spki = public_key_der(recipient_public_key_pem)?;
    let public_key =
        PublicEncryptingKey::from_der(&spki).map_err(|_| CryptoError::InvalidKey)?;
    let oaep = OaepPublicEncryptingKey::new(public_key).map_err(|_| CryptoError::InvalidKey)?;

    let mut cek = [0u8; CEK_LEN];
    aws_lc_rs::rand::fill(&mut cek).map_err(|_| CryptoError::Encrypt)?;

    let mut wrapped = vec![0u8; oaep.ciphertext_size()];
    let wrapped_len = oaep
        .encrypt(&OAEP_SHA1_MGF1SHA1, &cek, &mut wrapped, None)
        .map_err(|_| CryptoError::Encrypt)?
        .len();
    wrapped.truncate(wrapped_len);

    let header_json = serde_json::to_vec(protected_headers).map_err(|_| CryptoError::Encrypt)?;
    let header_b64 = URL_SAFE_NO_PAD.encode(&header_json);

    let mut iv = [0u8; NONCE_LEN];
    aws_lc_rs::rand::fill(&mut iv).map_err(|_| CryptoError::Encrypt)?;

    let key = UnboundKey::new(&AES_256_GCM, &cek).map_err(|_| CryptoError::Encrypt)?;
    let key = LessSafeKey::new(key);
    let nonce = Nonce::try_assume_unique_for_key(&iv).map_err(|_| CryptoError::Encrypt)?;

    // AAD is the ASCII of the base64url-encoded protected header (RFC 7516 §5.1)
    let mut in_out = serde_json::to_vec(payload).map_err(|_| CryptoError::Encrypt)?;
    let tag = key
        .seal_in_place_separate_tag(nonce, Aad::from(header_b64.as_bytes()), &mut in_out)
        .map_err(|_| CryptoError::Encrypt)?;

    Ok([
        header_b64,
        URL_SAFE_NO_PAD.encode(&wrapped),
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(&in_out),
        URL_SAFE_NO_PAD.encode(tag.as_ref()),
    ]
    .join("."))
}

///
/// Decrypt a compact token with our PKCS#8 private key.
///
/// Key-unwrap and MAC failures surface as [`CryptoError::Decrypt`];
/// anything structurally wrong with the token is [`CryptoError::InvalidToken`].
///
pub fn decrypt(
    local_private_key_pem: &str,
    compact_token: &str,
) -> Result<DecryptedEnvelope, CryptoError> {
    let segments: Vec<&str> = compact_token.split('.').collect();
    let [header_b64, wrapped_b64, iv_b64, ciphertext_b64, tag_b64] = segments[..] else {
        return Err(CryptoError::InvalidToken);
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| CryptoError::InvalidToken)?;
    let headers: Value =
        serde_json::from_slice(&header_json).map_err(|_| CryptoError::InvalidToken)?;

    let wrapped = URL_SAFE_NO_PAD
        .decode(wrapped_b64)
        .map_err(|_| CryptoError::InvalidToken)?;
    let iv = URL_SAFE_NO_PAD
        .decode(iv_b64)
        .map_err(|_| CryptoError::InvalidToken)?;
    if iv.len() != NONCE_LEN {
        return Err(CryptoError::InvalidToken);
    }
    let ciphertext = URL_SAFE_NO_PAD
        .decode(ciphertext_b64)
        .map_err(|_| CryptoError::InvalidToken)?;
    let tag = URL_SAFE_NO_PAD
        .decode(tag_b64)
        .map_err(|_| CryptoError::InvalidToken)?;
    if tag.len() != TAG_LEN {
        return Err(CryptoError::InvalidToken);
    }

    let private_key = private_key(local_private_key_pem)?;
    let oaep = OaepPrivateDecryptingKey::new(private_key).map_err(|_| CryptoError::InvalidKey)?;

    let mut cek_buf = vec![0u8; oaep.min_output_size()];
    let cek = oaep
        .decrypt(&OAEP_SHA1_MGF1SHA1, &wrapped, &mut cek_buf, None)
        .map_err(|_| CryptoError::Decrypt)?;
    if cek.len() != CEK_LEN {
        return Err(CryptoError::Decrypt);
    }

    let key = UnboundKey::new(&AES_256_GCM, cek).map_err(|_| CryptoError::Decrypt)?;
    let key = LessSafeKey::new(key);
    let nonce = Nonce::try_assume_unique_for_key(&iv).map_err(|_| CryptoError::Decrypt)?;

    let mut in_out = [ciphertext, tag].concat();
    let plaintext = key
        .open_in_place(nonce, Aad::from(header_b64.as_bytes()), &mut in_out)
        .map_err(|_| CryptoError::Decrypt)?;

    let payload: Value =
        serde_json::from_slice(plaintext).map_err(|_| CryptoError::InvalidToken)?;

    Ok(DecryptedEnvelope { headers, payload })
}

/// Validate that a PEM private key parses, without keeping the key around.
/// Called once at startup so a bad key fails fast instead of on the first callback.
pub fn check_private_key(pem: &str) -> Result<(), CryptoError> {
    private_key(pem).map(|_| ())
}

fn private_key(pem: &str) -> Result<PrivateDecryptingKey, CryptoError> {
    let der =
        PrivatePkcs8KeyDer::from_pem_slice(pem.as_bytes()).map_err(|_| CryptoError::InvalidKey)?;
    PrivateDecryptingKey::from_pkcs8(der.secret_pkcs8_der()).map_err(|_| CryptoError::InvalidKey)
}

/// Extract SubjectPublicKeyInfo DER from either an X.509 certificate PEM
/// or a bare public-key PEM.
fn public_key_der(pem: &str) -> Result<Vec<u8>, CryptoError> {
    if pem.contains("BEGIN CERTIFICATE") {
        let cert =
            CertificateDer::from_pem_slice(pem.as_bytes()).map_err(|_| CryptoError::InvalidKey)?;
        let (_, parsed) =
            X509Certificate::from_der(cert.as_ref()).map_err(|_| CryptoError::InvalidKey)?;
        return Ok(parsed.public_key().raw.to_vec());
    }

    let spki = SubjectPublicKeyInfoDer::from_pem_slice(pem.as_bytes())
        .map_err(|_| CryptoError::InvalidKey)?;
    Ok(spki.as_ref().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOCAL_PRIVATE: &str = include_str!("../../tests/keys/local_private.pem");
    const LOCAL_CERT: &str = include_str!("../../tests/keys/local_cert.pem");
    const PAYOR_PUBLIC: &str = include_str!("../../tests/keys/payor_public.pem");
    const PAYOR_PRIVATE: &str = include_str!("../../tests/keys/payor_private.pem");

    fn headers() -> serde_json::Value {
        json!({
            "alg": JWE_ALG,
            "enc": JWE_ENC,
            "x-hcx-sender_code": "1-test-provider",
            "x-hcx-recipient_code": "1-test-payor",
        })
    }

    #[test]
    fn round_trip_with_certificate_key() {
        let payload = json!({"resourceType": "Bundle", "id": "b-1", "entry": []});

        let token = encrypt(LOCAL_CERT, &payload, &headers()).unwrap();
        let envelope = decrypt(LOCAL_PRIVATE, &token).unwrap();

        assert_eq!(envelope.payload, payload);
        assert_eq!(envelope.headers, headers());
    }

    #[test]
    fn round_trip_with_bare_public_key() {
        let payload = json!({"hello": "payor"});

        let token = encrypt(PAYOR_PUBLIC, &payload, &headers()).unwrap();
        let envelope = decrypt(PAYOR_PRIVATE, &token).unwrap();

        assert_eq!(envelope.payload, payload);
    }

    #[test]
    fn round_trip_large_payload() {
        // 64 KiB of content survives intact
        let blob = "x".repeat(64 * 1024);
        let payload = json!({ "blob": blob });

        let token = encrypt(LOCAL_CERT, &payload, &headers()).unwrap();
        let envelope = decrypt(LOCAL_PRIVATE, &token).unwrap();

        assert_eq!(envelope.payload, payload);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let token = encrypt(LOCAL_CERT, &json!({"a": 1}), &headers()).unwrap();

        let err = decrypt(PAYOR_PRIVATE, &token).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt));
    }

    #[test]
    fn tampered_ciphertext_fails_mac() {
        let token = encrypt(LOCAL_CERT, &json!({"a": 1}), &headers()).unwrap();

        let mut segments: Vec<String> = token.split('.').map(String::from).collect();
        // Flip a character in the ciphertext segment
        let mut chars: Vec<char> = segments[3].chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        segments[3] = chars.into_iter().collect();

        let err = decrypt(LOCAL_PRIVATE, &segments.join(".")).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt));
    }

    #[test]
    fn tampered_header_fails_mac() {
        let token = encrypt(LOCAL_CERT, &json!({"a": 1}), &headers()).unwrap();

        let mut segments: Vec<String> = token.split('.').map(String::from).collect();
        let altered = json!({"alg": JWE_ALG, "enc": JWE_ENC, "x-hcx-sender_code": "1-impostor"});
        segments[0] =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&altered).unwrap());

        let err = decrypt(LOCAL_PRIVATE, &segments.join(".")).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", "a.b.c", "a.b.c.d.e.f", "not base64 at all"] {
            let err = decrypt(LOCAL_PRIVATE, token).unwrap_err();
            assert!(matches!(err, CryptoError::InvalidToken), "token: {token}");
        }
    }

    #[test]
    fn garbage_keys_are_rejected() {
        let payload = json!({"a": 1});

        assert!(matches!(
            encrypt("not a pem", &payload, &headers()).unwrap_err(),
            CryptoError::InvalidKey
        ));

        let token = encrypt(LOCAL_CERT, &payload, &headers()).unwrap();
        assert!(matches!(
            decrypt("not a pem", &token).unwrap_err(),
            CryptoError::InvalidKey
        ));
    }
}
