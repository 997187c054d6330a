//! The contract a type satisfies to be sealed into a container.

use serde::{de::DeserializeOwned, Serialize};

/// A value with a byte representation that can be rebuilt from those bytes.
///
/// Both directions report failure as `None` rather than erroring: the
/// processor turns a missing byte representation into
/// `ArchiveError::ZeroDataSize` and a failed rebuild into
/// `ArchiveError::UnableToGetHeaderField`.
pub trait Archivable: Sized {
    fn to_bytes(&self) -> Option<Vec<u8>>;

    fn from_bytes(bytes: &[u8]) -> Option<Self>;
}

impl Archivable for Vec<u8> {
    fn to_bytes(&self) -> Option<Vec<u8>> {
        Some(self.clone())
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Some(bytes.to_vec())
    }
}

impl Archivable for String {
    fn to_bytes(&self) -> Option<Vec<u8>> {
        Some(self.as_bytes().to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

/// Adapter archiving any serde type as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize + DeserializeOwned> Archivable for Json<T> {
    fn to_bytes(&self) -> Option<Vec<u8>> {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(error = %e, "JSON encoding failed");
                None
            }
        }
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok().map(Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        pinned: bool,
    }

    #[test]
    fn test_string_rejects_invalid_utf8() {
        assert!(String::from_bytes(&[0xff, 0xfe]).is_none());
        assert_eq!(String::from_bytes(b"ok").as_deref(), Some("ok"));
    }

    #[test]
    fn test_json_adapter_roundtrip() {
        let note = Json(Note {
            title: "groceries".into(),
            pinned: true,
        });
        let bytes = note.to_bytes().unwrap();
        let back = Json::<Note>::from_bytes(&bytes).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_json_adapter_rejects_malformed() {
        assert!(Json::<Note>::from_bytes(b"{\"title\":").is_none());
    }
}
