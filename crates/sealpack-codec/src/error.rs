use std::io;

use sealpack_core::Profile;
use thiserror::Error;

use crate::header::HeaderError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed container header: {0}")]
    Header(#[from] HeaderError),

    #[error("no symmetric key bound to the encryption context")]
    NoKey,

    #[error("{profile:?} requires a {expected}-byte key, got {actual}")]
    KeyLength {
        profile: Profile,
        expected: usize,
        actual: usize,
    },

    #[error("context was derived from a container header and cannot encrypt")]
    DerivedContext,

    #[error("context was not derived from a container header and cannot decrypt")]
    FreshContext,

    #[error("authentication failed")]
    Auth,

    #[error("key setup failed: {0}")]
    KeySetup(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
