//! `SecurityKey`: an opaque verification capability the core
//! consumes but never specifies the cryptography of. Two default
//! implementations are provided for hosts with no key type of their own;
//! hosts are free to implement `SecurityKey`/`SigningCredentials` against
//! whatever key-management story they already have (KMS, HSM, ...).

use hmac::{Hmac, Mac};
use ring::signature::{self, UnparsedPublicKey};
use sha2::Sha256;

/// A candidate key the signature verifier may try.
pub trait SecurityKey: Send + Sync {
    fn key_id(&self) -> Option<&str>;
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;
}

/// A key capable of producing a signature, consumed by the assertion
/// builder and the default serializer when signing outbound assertions.
pub trait SigningCredentials: Send + Sync {
    fn key_id(&self) -> Option<&str>;
    fn sign(&self, data: &[u8]) -> Vec<u8>;
}

/// RSASSA-PKCS1-v1_5 with SHA-256, verified via `ring`.
pub struct RsaSecurityKey {
    key_id: Option<String>,
    /// DER-encoded PKCS#1 `RSAPublicKey`.
    public_key_der: Vec<u8>,
}

impl RsaSecurityKey {
    pub fn new(key_id: impl Into<Option<String>>, public_key_der: Vec<u8>) -> Self {
        Self { key_id: key_id.into(), public_key_der }
    }
}

impl SecurityKey for RsaSecurityKey {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let key = UnparsedPublicKey::new(
            &signature::RSA_PKCS1_2048_8192_SHA256,
            &self.public_key_der,
        );
        key.verify(data, signature).is_ok()
    }
}

/// An RSA signing credential, wrapping a PKCS#1 DER private key via the
/// `rsa` crate (used only for producing signatures; verification of
/// whatever it produces goes through [`RsaSecurityKey`]).
pub struct RsaSigningCredentials {
    key_id: Option<String>,
    signing_key: rsa::pkcs1v15::SigningKey<Sha256>,
}

impl RsaSigningCredentials {
    pub fn new(key_id: impl Into<Option<String>>, private_key: rsa::RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key),
        }
    }
}

impl SigningCredentials for RsaSigningCredentials {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        use rsa::signature::{SignatureEncoding, Signer};
        self.signing_key.sign(data).to_vec()
    }
}

type HmacSha256 = Hmac<Sha256>;

/// A shared-secret key, useful for tests and for IdPs that sign with HMAC
/// rather than asymmetric keys.
pub struct HmacSecurityKey {
    key_id: Option<String>,
    secret: Vec<u8>,
}

impl HmacSecurityKey {
    pub fn new(key_id: impl Into<Option<String>>, secret: Vec<u8>) -> Self {
        Self { key_id: key_id.into(), secret }
    }
}

impl SecurityKey for HmacSecurityKey {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(data);
        mac.verify_slice(signature).is_ok()
    }
}

impl SigningCredentials for HmacSecurityKey {
    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_key_round_trips() {
        let key = HmacSecurityKey::new(Some("k1".to_string()), b"shared-secret".to_vec());
        let sig = key.sign(b"payload");
        assert!(key.verify(b"payload", &sig));
        assert!(!key.verify(b"tampered", &sig));
    }

    #[test]
    fn hmac_key_id_is_exposed() {
        let key = HmacSecurityKey::new(Some("k1".to_string()), b"secret".to_vec());
        assert_eq!(key.key_id(), Some("k1"));
    }
}
