//! Standard security handler key derivation (revisions 2-4)
//!
//! Algorithms 2-7 of ISO 32000-1, section 7.6.3.

use md5::{Digest, Md5};

use super::rc4::rc4_crypt;

/// Password padding string (Algorithm 2, step a)
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// Parameters of an encryption dictionary needed to derive keys
#[derive(Debug, Clone)]
pub(crate) struct HandlerParams {
    pub revision: u32,
    /// Key length in bytes (5..=16)
    pub key_length: usize,
    pub owner_hash: Vec<u8>,
    pub user_hash: Vec<u8>,
    pub permissions: i32,
    pub file_id: Vec<u8>,
    pub encrypt_metadata: bool,
}

pub(crate) fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Algorithm 2: file encryption key from a user password
pub(crate) fn file_key(password: &[u8], params: &HandlerParams) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(&params.owner_hash);
    hasher.update(params.permissions.to_le_bytes());
    hasher.update(&params.file_id);
    if params.revision >= 4 && !params.encrypt_metadata {
        hasher.update([0xFF; 4]);
    }
    let mut hash = hasher.finalize().to_vec();

    let n = params.key_length.min(16);
    if params.revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..n]).to_vec();
        }
    }
    hash.truncate(n);
    hash
}

/// RC4 key derived from the owner password (Algorithm 3, steps a-d)
fn owner_rc4_key(owner_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let n = key_length.min(16);
    let mut hash = Md5::digest(pad_password(owner_password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    hash.truncate(n);
    hash
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// Algorithm 3: the /O value
pub(crate) fn owner_hash(
    owner_password: &[u8],
    user_password: &[u8],
    revision: u32,
    key_length: usize,
) -> Vec<u8> {
    let source = if owner_password.is_empty() {
        user_password
    } else {
        owner_password
    };
    let key = owner_rc4_key(source, revision, key_length);

    let mut result = rc4_crypt(&key, &pad_password(user_password));
    if revision >= 3 {
        for round in 1..=19u8 {
            result = rc4_crypt(&xor_key(&key, round), &result);
        }
    }
    result
}

/// Algorithms 4 and 5: the /U value for a file key
pub(crate) fn user_hash(key: &[u8], revision: u32, file_id: &[u8]) -> Vec<u8> {
    if revision < 3 {
        return rc4_crypt(key, &PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut result = rc4_crypt(key, &hasher.finalize());
    for round in 1..=19u8 {
        result = rc4_crypt(&xor_key(key, round), &result);
    }
    result.resize(32, 0);
    result
}

/// Algorithm 6: returns the file key when `password` is the user password
pub(crate) fn authenticate_user(password: &[u8], params: &HandlerParams) -> Option<Vec<u8>> {
    let key = file_key(password, params);
    let expected = user_hash(&key, params.revision, &params.file_id);
    let compare = if params.revision >= 3 { 16 } else { 32 };

    if params.user_hash.len() < compare {
        return None;
    }
    constant_time_eq(&expected[..compare], &params.user_hash[..compare]).then_some(key)
}

/// Algorithm 7: returns the file key when `password` is the owner password
pub(crate) fn authenticate_owner(password: &[u8], params: &HandlerParams) -> Option<Vec<u8>> {
    let key = owner_rc4_key(password, params.revision, params.key_length);

    let mut user_password = params.owner_hash.clone();
    if params.revision >= 3 {
        for round in (0..=19u8).rev() {
            user_password = rc4_crypt(&xor_key(&key, round), &user_password);
        }
    } else {
        user_password = rc4_crypt(&key, &user_password);
    }

    authenticate_user(&user_password, params)
}

/// Per-object key (Algorithm 1); `aes` appends the "sAlT" marker
pub(crate) fn object_key(file_key: &[u8], id: (u32, u16), aes: bool) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&id.0.to_le_bytes()[..3]);
    hasher.update(id.1.to_le_bytes());
    if aes {
        hasher.update(b"sAlT");
    }
    let hash = hasher.finalize();
    let n = (file_key.len() + 5).min(16);
    hash[..n].to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
