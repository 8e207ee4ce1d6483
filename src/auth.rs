//! Legacy password hashing
//!
//! Passwords are stored as `"<nonce>:<sha1hex(nonce:uid:passwd)>"`.
//! The scheme is inherited from the existing user databases; changing
//! it would require a layout upgrade step that rewrites every
//! `user.json`.

use constant_time_eq::constant_time_eq;
use sha1::{Digest, Sha1};

/// Hash a password.
///
/// If `nonce` is `None`, an 8-hex-char nonce is generated from the
/// process RNG.
pub fn hash_password(uid: &str, passwd: &str, nonce: Option<&str>) -> String {
    let generated;
    let nonce = match nonce {
        Some(n) => n,
        None => {
            generated = format!("{:08x}", rand::random::<u32>());
            &generated
        }
    };

    let combi = format!("{}:{}:{}", nonce, uid, passwd);
    let hash = hex::encode(Sha1::digest(combi.as_bytes()));

    format!("{}:{}", nonce, hash)
}

/// Check a password against a stored hash.
///
/// The stored value is split on its first `:`; the comparison of the
/// recomputed hash is constant-time.
pub fn check_password(uid: &str, passwd: &str, stored: &str) -> bool {
    let Some((nonce, _)) = stored.split_once(':') else {
        return false;
    };

    let recomputed = hash_password(uid, passwd, Some(nonce));
    constant_time_eq(stored.as_bytes(), recomputed.as_bytes())
}
