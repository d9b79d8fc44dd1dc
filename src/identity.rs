//! Peer Identities
//!
//! Each connected peer is addressed by an opaque identity: a byte sequence
//! of 1 to 255 bytes used as the routing key. Peers may assign their own
//! identity during connection setup; otherwise the router generates one.
//! Generated identities carry a reserved `0x00` first byte so they can
//! never collide with a peer-assigned identity, and are unique only among
//! currently-connected peers — identities of disconnected peers may be
//! reused.

use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Maximum identity length in bytes.
pub const MAX_IDENTITY_LEN: usize = 255;

/// First byte reserved for router-generated identities.
///
/// Peer-suggested identities must not start with this byte.
pub const GENERATED_PREFIX: u8 = 0x00;

/// Errors related to identity validation.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,

    #[error("identity too long: {len} bytes (max {MAX_IDENTITY_LEN})")]
    TooLong { len: usize },

    #[error("identity starts with reserved byte 0x00")]
    ReservedPrefix,
}

/// Opaque address naming one connected peer.
///
/// Interpreted only by equality and hashing; the router never looks
/// inside the bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// Create an identity from raw bytes.
    ///
    /// Validates length only. Address frames may legitimately name
    /// generated identities, so the reserved prefix is allowed here;
    /// use [`Identity::from_hint`] for peer-suggested identities.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.is_empty() {
            return Err(IdentityError::Empty);
        }
        if bytes.len() > MAX_IDENTITY_LEN {
            return Err(IdentityError::TooLong { len: bytes.len() });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Validate a peer-suggested identity.
    ///
    /// Like [`Identity::from_bytes`] but additionally rejects the
    /// reserved `0x00` prefix, which is set aside for generated
    /// identities.
    pub fn from_hint(bytes: &[u8]) -> Result<Self, IdentityError> {
        let identity = Self::from_bytes(bytes)?;
        if identity.0[0] == GENERATED_PREFIX {
            return Err(IdentityError::ReservedPrefix);
        }
        Ok(identity)
    }

    /// Generate a random identity: the reserved prefix plus four random
    /// bytes.
    ///
    /// Uniqueness against currently-connected peers is the caller's
    /// responsibility (regenerate on collision against the live table).
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut bytes = vec![GENERATED_PREFIX; 5];
        rng.fill(&mut bytes[1..]);
        Self(bytes)
    }

    /// Whether this identity was router-generated.
    pub fn is_generated(&self) -> bool {
        self.0[0] == GENERATED_PREFIX
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no bytes. The constructors reject empty
    /// input, so this is always false for constructed identities.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Try to interpret as a UTF-8 string.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Identity(\"{}\")", s),
            None => write!(f, "Identity({:?})", self.0),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Best-effort display as string if valid UTF-8, else hex
        match self.as_str() {
            Some(s) => write!(f, "{}", s),
            None => {
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<Identity> for Vec<u8> {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let id = Identity::from_bytes(b"peer-a").unwrap();
        assert_eq!(id.as_bytes(), b"peer-a");
        assert_eq!(id.len(), 6);
        assert!(!id.is_empty());
        assert!(!id.is_generated());
    }

    #[test]
    fn test_from_bytes_rejects_empty() {
        assert!(matches!(
            Identity::from_bytes(b""),
            Err(IdentityError::Empty)
        ));
    }

    #[test]
    fn test_from_bytes_rejects_oversized() {
        let long = vec![0x41u8; MAX_IDENTITY_LEN + 1];
        assert!(matches!(
            Identity::from_bytes(&long),
            Err(IdentityError::TooLong { len: 256 })
        ));
    }

    #[test]
    fn test_from_bytes_accepts_max_length() {
        let max = vec![0x41u8; MAX_IDENTITY_LEN];
        assert!(Identity::from_bytes(&max).is_ok());
    }

    #[test]
    fn test_from_bytes_allows_reserved_prefix() {
        // Address frames may name generated identities
        let id = Identity::from_bytes(&[0x00, 1, 2, 3, 4]).unwrap();
        assert!(id.is_generated());
    }

    #[test]
    fn test_from_hint_rejects_reserved_prefix() {
        assert!(matches!(
            Identity::from_hint(&[0x00, 1, 2]),
            Err(IdentityError::ReservedPrefix)
        ));
    }

    #[test]
    fn test_from_hint_accepts_plain() {
        let id = Identity::from_hint(b"B").unwrap();
        assert_eq!(id.as_bytes(), b"B");
    }

    #[test]
    fn test_generate_shape() {
        let mut rng = rand::thread_rng();
        let id = Identity::generate(&mut rng);
        assert_eq!(id.len(), 5);
        assert!(id.is_generated());
        assert_eq!(id.as_bytes()[0], GENERATED_PREFIX);
    }

    #[test]
    fn test_display_utf8() {
        let id = Identity::from_bytes(b"worker-1").unwrap();
        assert_eq!(format!("{}", id), "worker-1");
    }

    #[test]
    fn test_display_binary_as_hex() {
        let id = Identity::from_bytes(&[0x00, 0xff, 0x80]).unwrap();
        assert_eq!(format!("{}", id), "00ff80");
        assert!(id.as_str().is_none());
    }

    #[test]
    fn test_equality_and_hash_key() {
        use std::collections::HashMap;
        let a1 = Identity::from_bytes(b"A").unwrap();
        let a2 = Identity::from_bytes(b"A").unwrap();
        let b = Identity::from_bytes(b"B").unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);

        let mut map = HashMap::new();
        map.insert(a1, 1);
        assert_eq!(map.get(&a2), Some(&1));
    }
}
