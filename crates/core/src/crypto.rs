//! Ed25519 wallets, signatures and pubkey-hash addresses.

use crate::hash::{hash, hex_bytes, Hash};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Size of a pubkey-hash in bytes.
pub const PUBKEY_HASH_SIZE: usize = 20;

/// Size of the checksum appended to an encoded address.
pub const CHECKSUM_SIZE: usize = 4;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("signature verification failed")]
    VerificationFailed,
}

/// A 20-byte digest of a wallet's public key; the ledger-visible identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct PubKeyHash(pub [u8; PUBKEY_HASH_SIZE]);

impl PubKeyHash {
    /// Create a pubkey-hash from raw bytes.
    pub fn from_bytes(bytes: [u8; PUBKEY_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; PUBKEY_HASH_SIZE] {
        &self.0
    }

    /// Convert to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;
        let arr = <[u8; PUBKEY_HASH_SIZE]>::try_from(bytes.as_slice())
            .map_err(|_| CryptoError::InvalidAddress(format!("expected 20 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Encode as a base58 address with a 4-byte double-SHA-256 checksum.
    pub fn to_address(&self) -> String {
        let mut payload = Vec::with_capacity(PUBKEY_HASH_SIZE + CHECKSUM_SIZE);
        payload.extend_from_slice(&self.0);
        payload.extend_from_slice(&address_checksum(&self.0));
        bs58::encode(payload).into_string()
    }

    /// Decode a base58 address back into its pubkey-hash.
    pub fn from_address(address: &str) -> Result<Self, CryptoError> {
        let payload = bs58::decode(address)
            .into_vec()
            .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;
        if payload.len() != PUBKEY_HASH_SIZE + CHECKSUM_SIZE {
            return Err(CryptoError::InvalidAddress(format!(
                "expected {} decoded bytes, got {}",
                PUBKEY_HASH_SIZE + CHECKSUM_SIZE,
                payload.len()
            )));
        }
        let (body, checksum) = payload.split_at(PUBKEY_HASH_SIZE);
        let mut bytes = [0u8; PUBKEY_HASH_SIZE];
        bytes.copy_from_slice(body);
        if checksum != &address_checksum(&bytes)[..] {
            return Err(CryptoError::InvalidAddress("checksum mismatch".into()));
        }
        Ok(Self(bytes))
    }
}

fn address_checksum(pubkey_hash: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let first = hash(pubkey_hash);
    let second = hash(first.as_bytes());
    let mut out = [0u8; CHECKSUM_SIZE];
    out.copy_from_slice(&second.0[..CHECKSUM_SIZE]);
    out
}

impl fmt::Debug for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKeyHash({})", self.to_hex())
    }
}

impl fmt::Display for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for PubKeyHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for PubKeyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex_bytes::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PubKeyHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hex_bytes::deserialize(deserializer).map(PubKeyHash)
    }
}

/// A cryptographic signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSignature)?;
        let arr = <[u8; 64]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }

    /// An all-zero signature marks an unsigned transaction.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 64]
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex_bytes::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hex_bytes::deserialize(deserializer).map(Signature)
    }
}

/// A public key for signature verification.
#[derive(Clone)]
pub struct PublicKey(pub VerifyingKey);

impl PublicKey {
    /// Parse a public key from its 32 raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Parse a public key from hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(&arr)
    }

    /// Derive the pubkey-hash: the first 20 bytes of SHA-256 of the key.
    pub fn to_pubkey_hash(&self) -> PubKeyHash {
        let digest = hash(self.0.as_bytes());
        let mut out = [0u8; PUBKEY_HASH_SIZE];
        out.copy_from_slice(&digest.0[..PUBKEY_HASH_SIZE]);
        PubKeyHash(out)
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex_bytes::serialize(self.0.as_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: [u8; 32] = hex_bytes::deserialize(deserializer)?;
        PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// A wallet: the signing key behind a pubkey-hash.
pub struct Wallet {
    signing_key: SigningKey,
    pub public_key: PublicKey,
}

impl Wallet {
    /// Generate a new random wallet.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Restore a wallet from its private key (32 bytes).
    pub fn from_private_key(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Restore a wallet from a hex-encoded private key.
    pub fn from_private_key_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let arr = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_private_key(&arr))
    }

    /// Get the private key bytes.
    pub fn private_key(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The pubkey-hash this wallet owns items under.
    pub fn pubkey_hash(&self) -> PubKeyHash {
        self.public_key.to_pubkey_hash()
    }

    /// The base58 address of this wallet.
    pub fn address(&self) -> String {
        self.pubkey_hash().to_address()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes())
    }

    /// Sign a hash directly.
    pub fn sign_hash(&self, hash: &Hash) -> Signature {
        self.sign(hash.as_bytes())
    }

    /// Sign the SHA-256 digest of an arbitrary token string.
    pub fn sign_token(&self, token: &str) -> Signature {
        self.sign_hash(&hash(token.as_bytes()))
    }

    /// Verify a signature against our public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        self.public_key.verify(message, signature)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish()
    }
}

/// Check a signature produced by [`Wallet::sign_token`].
pub fn verify_token(public_key: &PublicKey, token: &str, signature: &Signature) -> Result<(), CryptoError> {
    public_key.verify(hash(token.as_bytes()).as_bytes(), signature)
}
