//! AES-256-CBC layer of the current save format.
//!
//! The game ships a single key and IV, so both are compile-time constants.
//! CBC chaining is done by hand over the raw block cipher.

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::error::MethodError;

pub const BLOCK_SIZE: usize = 16;

const KEY_WORDS: [u32; 8] = [
    2815074099, 1725469378, 4039046167, 874293617, 3063605751, 3133984764, 4097598161, 3620741625,
];

pub const AES_KEY: [u8; 32] = key_from_words(KEY_WORDS);

/// ASCII `tu89geji340t89u2`.
pub const AES_IV: [u8; BLOCK_SIZE] = [
    0x74, 0x75, 0x38, 0x39, 0x67, 0x65, 0x6a, 0x69, 0x33, 0x34, 0x30, 0x74, 0x38, 0x39, 0x75, 0x32,
];

const fn key_from_words(words: [u32; 8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < words.len() {
        let bytes = words[i].to_be_bytes();
        out[i * 4] = bytes[0];
        out[i * 4 + 1] = bytes[1];
        out[i * 4 + 2] = bytes[2];
        out[i * 4 + 3] = bytes[3];
        i += 1;
    }
    out
}

/// How the decrypted plaintext had its padding removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpadding {
    Pkcs7,
    ZeroStripped,
}

fn cipher() -> Aes256 {
    Aes256::new(GenericArray::from_slice(&AES_KEY))
}

/// Decrypts a full CBC ciphertext without removing padding.
pub fn decrypt(ciphertext: &[u8]) -> Result<Vec<u8>, MethodError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(MethodError::Padding {
            len: ciphertext.len(),
        });
    }

    let cipher = cipher();
    let mut out = ciphertext.to_vec();
    let mut prev = AES_IV;
    for chunk in out.chunks_exact_mut(BLOCK_SIZE) {
        let mut current = [0u8; BLOCK_SIZE];
        current.copy_from_slice(chunk);
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        for (byte, p) in chunk.iter_mut().zip(prev.iter()) {
            *byte ^= p;
        }
        prev = current;
    }
    Ok(out)
}

/// PKCS#7-pads and encrypts. Output length is always a positive multiple of
/// [`BLOCK_SIZE`].
pub fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    let cipher = cipher();
    let mut out = pkcs7_pad(plaintext);
    let mut prev = AES_IV;
    for chunk in out.chunks_exact_mut(BLOCK_SIZE) {
        for (byte, p) in chunk.iter_mut().zip(prev.iter()) {
            *byte ^= p;
        }
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        prev.copy_from_slice(chunk);
    }
    out
}

pub fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// Returns the unpadded slice, or `None` if the trailer is not valid PKCS#7.
pub fn pkcs7_unpad(data: &[u8]) -> Option<&[u8]> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return None;
    }
    let pad_len = *data.last()? as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE {
        return None;
    }
    let (body, trailer) = data.split_at(data.len() - pad_len);
    if trailer.iter().all(|&b| b as usize == pad_len) {
        Some(body)
    } else {
        None
    }
}

/// PKCS#7 first; on an invalid trailer, strip trailing NUL bytes instead.
pub fn unpad_lenient(data: &[u8]) -> (&[u8], Unpadding) {
    if let Some(body) = pkcs7_unpad(data) {
        return (body, Unpadding::Pkcs7);
    }
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1);
    (&data[..end], Unpadding::ZeroStripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn key_is_big_endian_encoding_of_constant_words() {
        assert_eq!(
            hex(&AES_KEY),
            "a7ca9f3366d892c2f0bef417341ca971b69ae9f7bacccffcf43c62d1d7d021f9"
        );
        assert_eq!(&AES_IV, b"tu89geji340t89u2");
    }

    #[test]
    fn encrypt_matches_known_ciphertext() {
        assert_eq!(hex(&encrypt(br#"{"a":1}"#)), "bbd6dc494177ad5a527db3c01488838f");
    }

    #[test]
    fn decrypt_known_multi_block_ciphertext() {
        let ciphertext = encrypt(br#"{"vault":{"VaultName":"042"}}"#);
        assert_eq!(
            hex(&ciphertext),
            "911524ae5f7aca387a569b605eccfb6f8463d2a750bb1ed8c7ac182b9654861a"
        );
        let plain = decrypt(&ciphertext).expect("aligned ciphertext");
        assert_eq!(
            pkcs7_unpad(&plain),
            Some(&br#"{"vault":{"VaultName":"042"}}"#[..])
        );
    }

    #[test]
    fn decrypt_rejects_unaligned_and_empty_input() {
        assert_eq!(decrypt(&[0u8; 17]), Err(MethodError::Padding { len: 17 }));
        assert_eq!(decrypt(&[]), Err(MethodError::Padding { len: 0 }));
    }

    #[test]
    fn pad_always_adds_at_least_one_byte() {
        assert_eq!(pkcs7_pad(&[]).len(), 16);
        assert_eq!(pkcs7_pad(&[1u8; 16]).len(), 32);
        assert_eq!(pkcs7_pad(&[1u8; 15])[15], 1);
    }

    #[test]
    fn unpad_rejects_bad_trailers() {
        let mut block = [b'x'; 16];
        block[15] = 0;
        assert_eq!(pkcs7_unpad(&block), None);
        block[15] = 17;
        assert_eq!(pkcs7_unpad(&block), None);
        block[14] = 3;
        block[15] = 2;
        assert_eq!(pkcs7_unpad(&block), None);
    }

    #[test]
    fn lenient_unpad_strips_trailing_zeros() {
        let mut block = br#"{"a":1}"#.to_vec();
        block.resize(16, 0);
        let (body, how) = unpad_lenient(&block);
        assert_eq!(body, br#"{"a":1}"#);
        assert_eq!(how, Unpadding::ZeroStripped);
    }

    #[test]
    fn zero_padded_ciphertext_decrypts() {
        // produced by an encoder that zero-pads instead of PKCS#7
        let ciphertext = [
            0x88, 0x7a, 0xd9, 0xfa, 0x59, 0x69, 0x2b, 0xce, 0x49, 0x71, 0xb8, 0x5e, 0x93, 0xe3,
            0x70, 0x91,
        ];
        let plain = decrypt(&ciphertext).expect("aligned ciphertext");
        assert_eq!(unpad_lenient(&plain), (&br#"{"a":1}"#[..], Unpadding::ZeroStripped));
    }
}
