//! Document ID generation, used by `CreateDocument` when the caller does
//! not supply one.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 24;

/// Generate a 24-character lowercase alphanumeric document id.
pub fn generate_doc_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
