//! REST request authentication: canonical strings and HMAC signatures.
//!
//! See <https://pusher.com/docs/channels/library_auth_reference/rest-api/#authentication>
//! for the client-side description of the scheme.

pub mod canonical;
pub mod signature;

pub use {
    canonical::{
        KEY_PARAM, QueryParams, SIGNATURE_PARAM, TIMESTAMP_PARAM, canonical_query,
        canonical_string,
    },
    signature::{SignatureError, sign, sign_request, verify},
};
