use crate::error::Error;
use crate::session::Session;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const SEPARATOR: &str = "--";

/// Turns sessions into cookie values and back.
pub trait SessionEncoder: Send + Sync {
    fn encode(&self, session: &Session) -> Result<String, Error>;

    /// The session held by `content`, or `None` when it cannot be trusted or read.
    fn decode(&self, content: &str) -> Result<Option<Session>, Error>;
}

/// Signs sessions with HMAC-SHA256 so clients cannot forge them, and optionally encrypts them.
///
/// The encoded form is `data--digest` where data is the URL safe base64 encoding of the JSON
/// session, or of its AES-256-GCM encryption, and digest the hex HMAC of data. Alternate
/// secrets are accepted when verifying, so the signing secret can be rotated without
/// dropping existing sessions.
pub struct SecureSessionEncoder {
    secrets: Vec<String>,
    cipher: Option<Aes256Gcm>,
}

impl SecureSessionEncoder {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { secrets: vec![secret.into()], cipher: None }
    }

    /// Also accepts sessions signed with any of `secrets`.
    pub fn accept_alternate_secrets<I, S>(mut self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets.extend(secrets.into_iter().map(Into::into));
        self
    }

    /// Encrypts sessions with a key derived from `passphrase`.
    pub fn encrypted(mut self, passphrase: &str) -> Self {
        let key = Sha256::digest(passphrase.as_bytes());
        self.cipher = Some(Aes256Gcm::new(&key));
        self
    }

    fn digest(secret: &str, data: &str) -> Result<HmacSha256, Error> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).map_err(Error::codec)?;
        mac.update(data.as_bytes());
        Ok(mac)
    }

    fn verify(&self, data: &str, digest: &str) -> bool {
        let Some(expected) = from_hex(digest) else {
            return false;
        };
        self.secrets
            .iter()
            .any(|secret| Self::digest(secret, data).is_ok_and(|mac| mac.verify_slice(&expected).is_ok()))
    }

    fn seal(&self, plain: Vec<u8>) -> Result<Vec<u8>, Error> {
        let Some(cipher) = &self.cipher else {
            return Ok(plain);
        };
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let encrypted = cipher.encrypt(Nonce::from_slice(&nonce), plain.as_slice()).map_err(Error::codec)?;

        let mut sealed = nonce.to_vec();
        sealed.extend(encrypted);
        Ok(sealed)
    }

    fn open(&self, sealed: Vec<u8>) -> Option<Vec<u8>> {
        let Some(cipher) = &self.cipher else {
            return Some(sealed);
        };
        if sealed.len() < NONCE_LEN {
            return None;
        }
        let (nonce, encrypted) = sealed.split_at(NONCE_LEN);
        cipher.decrypt(Nonce::from_slice(nonce), encrypted).inspect_err(|e| debug!(cause = %e, "cannot decrypt session")).ok()
    }
}

impl fmt::Debug for SecureSessionEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSessionEncoder")
            .field("secrets", &self.secrets.len())
            .field("encrypted", &self.cipher.is_some())
            .finish()
    }
}

impl SessionEncoder for SecureSessionEncoder {
    fn encode(&self, session: &Session) -> Result<String, Error> {
        let json = serde_json::to_vec(session).map_err(Error::codec)?;
        let data = URL_SAFE_NO_PAD.encode(self.seal(json)?);
        let secret = self.secrets.first().ok_or_else(|| Error::codec("no secret to sign sessions with"))?;
        let digest = Self::digest(secret, &data)?.finalize().into_bytes();
        Ok(format!("{data}{SEPARATOR}{}", to_hex(&digest)))
    }

    fn decode(&self, content: &str) -> Result<Option<Session>, Error> {
        let Some((data, digest)) = content.rsplit_once(SEPARATOR) else {
            return Ok(None);
        };
        if !self.verify(data, digest) {
            debug!("session digest mismatch");
            return Ok(None);
        }

        let session = URL_SAFE_NO_PAD
            .decode(data)
            .ok()
            .and_then(|sealed| self.open(sealed))
            .and_then(|json| serde_json::from_slice(&json).inspect_err(|e| debug!(cause = %e, "cannot read session")).ok());
        Ok(session)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}

fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len()).step_by(2).map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok()).collect()
}
