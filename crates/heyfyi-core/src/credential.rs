//! Credential policy: opaque codes, password strength, password hashing.
//!
//! Password hashes use Argon2id with a random salt, stored as PHC strings so
//! the algorithm parameters and salt travel with the hash.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use unicode_general_category::{GeneralCategory, get_general_category};

use crate::{Error, Result};

/// Minimum password length, in bytes.
pub const MIN_PASSWORD_LEN: usize = 8;

/// How many of the character classes a password must draw from.
const MIN_CHARACTER_CLASSES: usize = 3;

/// Length of every opaque code, in hex characters.
pub const OPAQUE_CODE_LEN: usize = 32;

// ─── Opaque codes ────────────────────────────────────────────────────────────

/// Generate a 32-character lowercase hex token for verification codes, reset
/// codes and session tokens.
///
/// Ten bytes from the OS entropy source are digested and the first half of
/// the digest is hex-encoded.
pub fn generate_opaque_code() -> Result<String> {
  let mut seed = [0u8; 10];
  OsRng.try_fill_bytes(&mut seed)?;
  let digest = Sha256::digest(seed);
  Ok(hex::encode(&digest[..OPAQUE_CODE_LEN / 2]))
}

// ─── Password strength ───────────────────────────────────────────────────────

fn is_symbol(c: char) -> bool {
  matches!(
    get_general_category(c),
    GeneralCategory::MathSymbol
      | GeneralCategory::CurrencySymbol
      | GeneralCategory::ModifierSymbol
      | GeneralCategory::OtherSymbol
  )
}

fn is_punctuation(c: char) -> bool {
  matches!(
    get_general_category(c),
    GeneralCategory::ConnectorPunctuation
      | GeneralCategory::DashPunctuation
      | GeneralCategory::OpenPunctuation
      | GeneralCategory::ClosePunctuation
      | GeneralCategory::InitialPunctuation
      | GeneralCategory::FinalPunctuation
      | GeneralCategory::OtherPunctuation
  )
}

fn is_upper(c: char) -> bool {
  get_general_category(c) == GeneralCategory::UppercaseLetter
}

fn is_lower(c: char) -> bool {
  get_general_category(c) == GeneralCategory::LowercaseLetter
}

fn is_digit(c: char) -> bool {
  get_general_category(c) == GeneralCategory::DecimalNumber
}

/// Symbols (`+`, `$`, `^`, …) and punctuation (`!`, `@`, `-`, …) are
/// separate classes.
const CHARACTER_CLASSES: [fn(char) -> bool; 5] =
  [is_upper, is_lower, is_symbol, is_digit, is_punctuation];

/// A password is acceptable when it is at least [`MIN_PASSWORD_LEN`] bytes
/// of UTF-8 long and uses at least three of the five character classes.
pub fn is_password_acceptable(password: &str) -> bool {
  if password.len() < MIN_PASSWORD_LEN {
    return false;
  }

  let classes = CHARACTER_CLASSES
    .iter()
    .filter(|class| password.chars().any(|c| class(c)))
    .count();

  classes >= MIN_CHARACTER_CLASSES
}

// ─── Hashing ─────────────────────────────────────────────────────────────────

/// Hash `plaintext` with Argon2id and a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(plaintext.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check `plaintext` against a stored PHC hash.
///
/// A malformed stored hash never matches.
pub fn verify_password(hash: &str, plaintext: &str) -> bool {
  let parsed = match PasswordHash::new(hash) {
    Ok(parsed) => parsed,
    Err(e) => {
      tracing::warn!(error = %e, "stored password hash is malformed");
      return false;
    }
  };

  Argon2::default()
    .verify_password(plaintext.as_bytes(), &parsed)
    .is_ok()
}
