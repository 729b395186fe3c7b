//! VAPID key handling for Web Push (RFC 8292).
//!
//! The private key is the raw 32-byte P-256 scalar and the public key the
//! 65-byte uncompressed SEC1 point, both base64url. This is the format
//! `VapidSignatureBuilder::from_base64()` expects and the one browsers take
//! as `applicationServerKey`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::config::PushSettings;

#[derive(Error, Debug)]
pub enum VapidError {
    #[error("invalid base64url for VAPID {0} key")]
    Encoding(&'static str),

    #[error("VAPID public key must be a 65-byte uncompressed P-256 point")]
    PublicKey,

    #[error("VAPID private key must be a 32-byte P-256 scalar, got {0} bytes")]
    PrivateKeyLength(usize),

    #[error("VAPID private key is not a valid P-256 scalar")]
    PrivateKey,

    #[error("inline VAPID keys need both push.public_key and push.private_key")]
    IncompleteInline,

    #[error("key file {path}: {reason}")]
    File { path: String, reason: String },
}

/// VAPID keypair for web push authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidKeys {
    public_key_b64: String,
    private_key_b64: String,
}

/// `keys.json` layout. Both camelCase and upper-case field names are in use.
#[derive(Debug, Deserialize)]
struct KeyFile {
    #[serde(rename = "publicKey", alias = "PUBLIC_KEY")]
    public_key: String,
    #[serde(rename = "privateKey", alias = "PRIVATE_KEY")]
    private_key: String,
}

fn decode(label: &'static str, value: &str) -> Result<Vec<u8>, VapidError> {
    BASE64URL
        .decode(value.trim().trim_end_matches('='))
        .map_err(|_| VapidError::Encoding(label))
}

impl VapidKeys {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);

        Self {
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
        }
    }

    /// Validate and wrap an existing keypair
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self, VapidError> {
        let pub_bytes = decode("public", public_key_b64)?;
        if pub_bytes.len() != 65 || pub_bytes[0] != 0x04 {
            return Err(VapidError::PublicKey);
        }

        let priv_bytes = decode("private", private_key_b64)?;
        if priv_bytes.len() != 32 {
            return Err(VapidError::PrivateKeyLength(priv_bytes.len()));
        }
        let signing_key =
            SigningKey::from_bytes(priv_bytes.as_slice().into()).map_err(|_| VapidError::PrivateKey)?;

        // the pair has to belong together or every push is rejected with 403
        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != pub_bytes.as_slice() {
            return Err(VapidError::PublicKey);
        }

        Ok(Self {
            public_key_b64: BASE64URL.encode(&pub_bytes),
            private_key_b64: BASE64URL.encode(&priv_bytes),
        })
    }

    /// Read a `keys.json` file
    pub fn load_file(path: &Path) -> Result<Self, VapidError> {
        let file_err = |reason: String| VapidError::File {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        let file: KeyFile = serde_json::from_str(&raw).map_err(|e| file_err(e.to_string()))?;
        Self::from_base64url(&file.public_key, &file.private_key)
    }

    /// The keypair in `keys.json` layout
    pub fn to_json_pretty(&self) -> String {
        let doc = serde_json::json!({
            "publicKey": self.public_key_b64,
            "privateKey": self.private_key_b64,
        });
        format!("{doc:#}\n")
    }

    /// Write the keypair in `keys.json` layout
    pub fn write_file(&self, path: &Path) -> Result<(), VapidError> {
        std::fs::write(path, self.to_json_pretty()).map_err(|e| VapidError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Inline keys win over the key file. `Ok(None)` when neither is set;
    /// half an inline pair is an error.
    pub fn from_settings(settings: &PushSettings) -> Result<Option<Self>, VapidError> {
        match (&settings.public_key, &settings.private_key) {
            (Some(public), Some(private)) => Self::from_base64url(public, private).map(Some),
            (Some(_), None) | (None, Some(_)) => Err(VapidError::IncompleteInline),
            (None, None) if settings.keys_file.exists() => {
                Self::load_file(&settings.keys_file).map(Some)
            },
            (None, None) => Ok(None),
        }
    }

    /// Sent to browsers as the `applicationServerKey`
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }
}
