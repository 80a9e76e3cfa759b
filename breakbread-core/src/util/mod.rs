mod id;
pub use id::*;

use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use regex::Regex;

/// Characters allowed in an invite code.
/// Visually ambiguous characters (0, O, 1, I) are excluded.
pub const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

lazy_static! {
    static ref INVITE_CODE_REGEX: Regex =
        Regex::new("^[A-HJ-NP-Z2-9]+$").expect("invite code regex is valid");
}

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Generates a shareable invite code from the restricted alphabet
pub fn invite_code(length: usize) -> String {
    let mut rng = thread_rng();

    (0..length)
        .map(|_| {
            let index = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
            INVITE_CODE_ALPHABET[index] as char
        })
        .collect()
}

/// Returns true if the given string has the shape of an invite code
pub fn is_valid_invite_code(code: &str, length: usize) -> bool {
    code.len() == length && INVITE_CODE_REGEX.is_match(code)
}

/// Builds a storage filename that will not collide with previous uploads
/// by the same owner
pub fn unique_filename(owner_id: &str, extension: &str) -> String {
    format!(
        "{}-{}.{}",
        owner_id,
        random_string(12).to_lowercase(),
        extension
    )
}
