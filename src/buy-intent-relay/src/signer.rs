//! Owner signing capabilities.
//!
//! The smart account owner never hands over a key. It only authorises digests: either an
//! in-process k256 key (CLI, tests) or a connected wallet session answering `personal_sign`.

use std::fmt;

use alloy_primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use k256::ecdsa::{SigningKey, VerifyingKey};
use serde_json::json;
use tracing::debug;

use crate::{errors::SignerError, rpc::JsonRpcEndpoint};

/// Added to `v` so the Safe verifies the signature as an `eth_sign` over the prefixed digest.
const ETH_SIGN_V_OFFSET: u8 = 4;

/// Something that can authorise a Safe operation digest on behalf of the owner.
#[async_trait]
pub trait SigningCapability: Send + Sync {
    /// Owner EOA address.
    fn address(&self) -> Address;

    /// 65-byte `r || s || v` signature the Safe accepts for `digest`.
    async fn authorize(&self, digest: B256) -> Result<[u8; 65], SignerError>;
}

/// EOA address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Drop the 0x04 SEC1 tag; the address is the low 20 bytes of the hash.
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..32])
}

/// Raw secp256k1 key held in process.
pub struct LocalKeySigner {
    key: SigningKey,
    address: Address,
}

impl fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalKeySigner {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        let key =
            SigningKey::from_slice(bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    /// Accepts the key with or without a `0x` prefix.
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let trimmed = hex_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

#[async_trait]
impl SigningCapability for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn authorize(&self, digest: B256) -> Result<[u8; 65], SignerError> {
        let (signature, recid) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| SignerError::Signing(e.to_string()))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(out)
    }
}

/// A connected wallet that signs through `personal_sign`.
#[derive(Clone, Debug)]
pub struct WalletSessionSigner {
    endpoint: JsonRpcEndpoint,
    address: Address,
}

impl WalletSessionSigner {
    pub fn new(endpoint: JsonRpcEndpoint, address: Address) -> Self {
        Self { endpoint, address }
    }
}

#[async_trait]
impl SigningCapability for WalletSessionSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn authorize(&self, digest: B256) -> Result<[u8; 65], SignerError> {
        debug!(owner = %self.address, %digest, "requesting wallet signature");
        let value = self
            .endpoint
            .request_value("personal_sign", json!([digest, self.address]))
            .await
            .map_err(|e| SignerError::Session(e.to_string()))?;
        let raw: Bytes = serde_json::from_value(value)
            .map_err(|e| SignerError::Session(format!("personal_sign: {e}")))?;
        session_signature_to_safe(&raw)
    }
}

/// Convert a `personal_sign` signature into the Safe `eth_sign` form (`v` in 31/32).
pub fn session_signature_to_safe(raw: &[u8]) -> Result<[u8; 65], SignerError> {
    let sig: [u8; 65] = raw
        .try_into()
        .map_err(|_| SignerError::Session(format!("expected 65 signature bytes, got {}", raw.len())))?;
    let mut out = sig;
    let v = match sig[64] {
        0 | 1 => sig[64] + 27,
        27 | 28 => sig[64],
        other => return Err(SignerError::Session(format!("unexpected recovery id {other}"))),
    };
    out[64] = v + ETH_SIGN_V_OFFSET;
    Ok(out)
}
