//! Identifiers shared by every layer of the bot.
//!
//! - [`Identity`]: the 8-character correspondent token (`ECHOECHO`, `8S3HMY9Z`, ...)
//! - [`GroupToken`]: 8 opaque bytes chosen by a group's creator
//! - [`MessageId`]: 64-bit message identifier minted by the transport

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};

use crate::error::IdentityError;

/// Length of an identity token in characters.
pub const IDENTITY_LEN: usize = 8;

const IDENTITY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// An 8-character uppercase alphanumeric identity.
///
/// Construction always goes through [`FromStr`], so an `Identity` in hand is
/// well-formed. Serialized as a plain string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Generate a random identity. Used when a fresh local identity is created.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; IDENTITY_LEN];
        for b in bytes.iter_mut() {
            *b = IDENTITY_ALPHABET[rng.gen_range(0..IDENTITY_ALPHABET.len())];
        }
        Identity(bytes)
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes from the alphabet ever get stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != IDENTITY_LEN {
            return Err(IdentityError::InvalidLength(s.to_string()));
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(IdentityError::InvalidCharacters(s.to_string()));
        }
        let mut out = [0u8; IDENTITY_LEN];
        out.copy_from_slice(bytes);
        Ok(Identity(out))
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque 8-byte group token. Rendered and stored as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupToken(pub [u8; 8]);

impl GroupToken {
    pub fn random() -> Self {
        GroupToken(rand::random())
    }
}

impl FromStr for GroupToken {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| IdentityError::InvalidGroupToken(s.to_string()))?;
        let token: [u8; 8] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidGroupToken(s.to_string()))?;
        Ok(GroupToken(token))
    }
}

impl std::fmt::Debug for GroupToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupToken({self})")
    }
}

impl Display for GroupToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for GroupToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for GroupToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Transport-level message identifier, displayed as 16 hex digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    pub fn random() -> Self {
        MessageId(rand::random())
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parsing() {
        let id: Identity = "8S3HMY9Z".parse().expect("valid identity");
        assert_eq!(id.to_string(), "8S3HMY9Z");

        assert!(matches!(
            "8S3HMY9".parse::<Identity>(),
            Err(IdentityError::InvalidLength(_))
        ));
        assert!(matches!(
            "8s3hmy9z".parse::<Identity>(),
            Err(IdentityError::InvalidCharacters(_))
        ));
        assert!(matches!(
            "8S3HM-9Z".parse::<Identity>(),
            Err(IdentityError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn test_random_identity_is_well_formed() {
        for _ in 0..32 {
            let id = Identity::random();
            let reparsed: Identity = id.as_str().parse().expect("random identity parses");
            assert_eq!(reparsed, id);
        }
    }

    #[test]
    fn test_identity_serde_as_string() {
        let id: Identity = "ECHOECHO".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ECHOECHO\"");
        assert!(serde_json::from_str::<Identity>("\"echo\"").is_err());
    }

    #[test]
    fn test_debug_output_is_readable() {
        let members: Vec<Identity> = vec![
            "ECHOECHO".parse().unwrap(),
            "8S3HMY9Z".parse().unwrap(),
        ];
        assert_eq!(format!("{members:?}"), "[ECHOECHO, 8S3HMY9Z]");
        assert_eq!(
            format!("{:?}", GroupToken([0xab; 8])),
            "GroupToken(abababababababab)"
        );
    }

    #[test]
    fn test_group_token_hex() {
        let token = GroupToken([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03]);
        assert_eq!(token.to_string(), "deadbeef00010203");
        assert_eq!("deadbeef00010203".parse::<GroupToken>().unwrap(), token);
        assert!("deadbeef".parse::<GroupToken>().is_err());
        assert!("zz".parse::<GroupToken>().is_err());
    }
}
