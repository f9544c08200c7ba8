// HYBRID container: PGP-wrapped session key + chunked STREAM AEAD
//
// Layout (integers big-endian):
//   magic "CRYQH1" | version u8 | cipher u8 | chunk_size u32 | wrapped_len u32 | wrapped key
//   | nonce prefix [7]
//   then per chunk: ct_len u32 | last u8 (0/1) | ciphertext (plaintext + 16 byte tag)
// The encoded header is the AAD of every chunk.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::stream::{DecryptorBE32, EncryptorBE32};
use aes_gcm::aead::{KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use cryptq_core::port::ProcessingError;
use rand::rngs::OsRng;
use rand::RngCore;
use std::io::{self, Read, Write};
use zeroize::Zeroizing;

use crate::config::{HybridCipher, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::io::read_full;
use crate::keys::{Recipient, UnlockedKey};
use crate::pgp_stream::{unwrap_session_key, wrap_session_key};

pub(crate) const MAGIC: &[u8; 6] = b"CRYQH1";
const VERSION: u8 = 1;
const SESSION_KEY_LEN: usize = 32;
const NONCE_PREFIX_LEN: usize = 7;
const TAG_LEN: u32 = 16;
const MAX_WRAPPED_LEN: u32 = 64 * 1024;
const FLAG_MORE: u8 = 0;
const FLAG_LAST: u8 = 1;

struct Header {
    cipher: HybridCipher,
    chunk_size: u32,
    wrapped_key: Vec<u8>,
    nonce_prefix: [u8; NONCE_PREFIX_LEN],
}

impl Header {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAGIC.len() + 14 + self.wrapped_key.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.push(self.cipher.id());
        out.extend_from_slice(&self.chunk_size.to_be_bytes());
        out.extend_from_slice(&(self.wrapped_key.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.wrapped_key);
        out.extend_from_slice(&self.nonce_prefix);
        out
    }

    /// Returns the header and its exact encoded bytes
    fn read_from<R: Read + ?Sized>(input: &mut R) -> Result<(Self, Vec<u8>), ProcessingError> {
        let mut fixed = [0u8; 6 + 1 + 1 + 4 + 4];
        read_exact_or_reject(input, &mut fixed, "header truncated")?;
        if &fixed[..6] != MAGIC {
            return Err(reject("not a hybrid container"));
        }
        if fixed[6] != VERSION {
            return Err(reject(&format!("unsupported container version {}", fixed[6])));
        }
        let cipher = HybridCipher::from_id(fixed[7])
            .ok_or_else(|| reject(&format!("unknown cipher id {}", fixed[7])))?;
        let chunk_size = u32::from_be_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]);
        let wrapped_len = u32::from_be_bytes([fixed[12], fixed[13], fixed[14], fixed[15]]);
        if wrapped_len == 0 || wrapped_len > MAX_WRAPPED_LEN {
            return Err(reject("corrupted header"));
        }
        // bounds the per-chunk buffer before anything is authenticated
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(reject(&format!("chunk size {} out of range", chunk_size)));
        }

        let mut wrapped_key = vec![0u8; wrapped_len as usize];
        read_exact_or_reject(input, &mut wrapped_key, "header truncated")?;
        let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
        read_exact_or_reject(input, &mut nonce_prefix, "header truncated")?;

        let header = Self {
            cipher,
            chunk_size,
            wrapped_key,
            nonce_prefix,
        };
        let raw = header.encode();
        Ok((header, raw))
    }
}

fn reject(msg: &str) -> ProcessingError {
    ProcessingError::DecryptionFailed(msg.to_string())
}

fn read_exact_or_reject<R: Read + ?Sized>(
    input: &mut R,
    buf: &mut [u8],
    msg: &str,
) -> Result<(), ProcessingError> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => reject(msg),
        _ => ProcessingError::from(e),
    })
}

/// STREAM encryptor for the configured cipher
enum ChunkSealer {
    AesGcm(EncryptorBE32<Aes256Gcm>),
    ChaCha(EncryptorBE32<ChaCha20Poly1305>),
}

impl ChunkSealer {
    fn new(cipher: HybridCipher, key: &[u8], nonce_prefix: &[u8; NONCE_PREFIX_LEN]) -> Self {
        let nonce = GenericArray::from_slice(nonce_prefix);
        let key = GenericArray::from_slice(key);
        match cipher {
            HybridCipher::Aes256Gcm => {
                ChunkSealer::AesGcm(EncryptorBE32::from_aead(Aes256Gcm::new(key), nonce))
            }
            HybridCipher::ChaCha20Poly1305 => ChunkSealer::ChaCha(EncryptorBE32::from_aead(
                ChaCha20Poly1305::new(key),
                nonce,
            )),
        }
    }

    fn seal_next(&mut self, msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, ProcessingError> {
        let payload = Payload { msg, aad };
        match self {
            ChunkSealer::AesGcm(e) => e.encrypt_next(payload),
            ChunkSealer::ChaCha(e) => e.encrypt_next(payload),
        }
        .map_err(|_| ProcessingError::StreamIo("AEAD seal failed".to_string()))
    }

    fn seal_last(self, msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, ProcessingError> {
        let payload = Payload { msg, aad };
        match self {
            ChunkSealer::AesGcm(e) => e.encrypt_last(payload),
            ChunkSealer::ChaCha(e) => e.encrypt_last(payload),
        }
        .map_err(|_| ProcessingError::StreamIo("AEAD seal failed".to_string()))
    }
}

/// STREAM decryptor; every failure is an authentication failure
enum ChunkOpener {
    AesGcm(DecryptorBE32<Aes256Gcm>),
    ChaCha(DecryptorBE32<ChaCha20Poly1305>),
}

impl ChunkOpener {
    fn new(cipher: HybridCipher, key: &[u8], nonce_prefix: &[u8; NONCE_PREFIX_LEN]) -> Self {
        let nonce = GenericArray::from_slice(nonce_prefix);
        let key = GenericArray::from_slice(key);
        match cipher {
            HybridCipher::Aes256Gcm => {
                ChunkOpener::AesGcm(DecryptorBE32::from_aead(Aes256Gcm::new(key), nonce))
            }
            HybridCipher::ChaCha20Poly1305 => ChunkOpener::ChaCha(DecryptorBE32::from_aead(
                ChaCha20Poly1305::new(key),
                nonce,
            )),
        }
    }

    fn open_next(&mut self, msg: &[u8], aad: &[u8], index: u64) -> Result<Vec<u8>, ProcessingError> {
        let payload = Payload { msg, aad };
        match self {
            ChunkOpener::AesGcm(d) => d.decrypt_next(payload),
            ChunkOpener::ChaCha(d) => d.decrypt_next(payload),
        }
        .map_err(|_| reject(&format!("chunk {} failed authentication", index)))
    }

    fn open_last(self, msg: &[u8], aad: &[u8], index: u64) -> Result<Vec<u8>, ProcessingError> {
        let payload = Payload { msg, aad };
        match self {
            ChunkOpener::AesGcm(d) => d.decrypt_last(payload),
            ChunkOpener::ChaCha(d) => d.decrypt_last(payload),
        }
        .map_err(|_| reject(&format!("final chunk {} failed authentication", index)))
    }
}

fn write_chunk<W: Write + ?Sized>(output: &mut W, flag: u8, ciphertext: &[u8]) -> io::Result<()> {
    output.write_all(&(ciphertext.len() as u32).to_be_bytes())?;
    output.write_all(&[flag])?;
    output.write_all(ciphertext)
}

/// Encrypt `input` into a hybrid container; returns plaintext bytes consumed
pub(crate) fn encrypt<R: Read + ?Sized, W: Write + ?Sized>(
    input: &mut R,
    output: &mut W,
    recipient: &Recipient,
    signer: Option<&UnlockedKey>,
    cipher: HybridCipher,
    chunk_size: u32,
) -> Result<u64, ProcessingError> {
    let mut session_key = Zeroizing::new([0u8; SESSION_KEY_LEN]);
    OsRng.fill_bytes(&mut session_key[..]);
    let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
    OsRng.fill_bytes(&mut nonce_prefix);

    let header = Header {
        cipher,
        chunk_size: chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE),
        wrapped_key: wrap_session_key(&session_key[..], recipient, signer)?,
        nonce_prefix,
    };
    let aad = header.encode();
    output.write_all(&aad)?;

    let mut sealer = ChunkSealer::new(cipher, &session_key[..], &nonce_prefix);
    let size = header.chunk_size as usize;
    let mut current = Zeroizing::new(vec![0u8; size]);
    let mut next = Zeroizing::new(vec![0u8; size]);
    let mut current_len = read_full(input, &mut current)?;
    let mut total = current_len as u64;

    // look one chunk ahead so the final chunk can be flagged
    loop {
        let next_len = if current_len == size {
            read_full(input, &mut next)?
        } else {
            0
        };
        if next_len == 0 {
            let ct = sealer.seal_last(&current[..current_len], &aad)?;
            write_chunk(output, FLAG_LAST, &ct)?;
            break;
        }
        let ct = sealer.seal_next(&current[..current_len], &aad)?;
        write_chunk(output, FLAG_MORE, &ct)?;
        std::mem::swap(&mut current, &mut next);
        current_len = next_len;
        total += next_len as u64;
    }
    Ok(total)
}

/// Decrypt a hybrid container; returns plaintext bytes written.
///
/// Truncation, reordering, tampering and a wrong key are all `DecryptionFailed`.
pub(crate) fn decrypt<R: Read + ?Sized, W: Write + ?Sized>(
    input: &mut R,
    output: &mut W,
    key: &UnlockedKey,
) -> Result<u64, ProcessingError> {
    let (header, aad) = Header::read_from(input)?;
    let session_key = unwrap_session_key(&header.wrapped_key, key)?;
    if session_key.len() != SESSION_KEY_LEN {
        return Err(reject("wrapped session key has the wrong length"));
    }

    let mut opener = ChunkOpener::new(header.cipher, &session_key, &header.nonce_prefix);
    let max_ct_len = header.chunk_size.saturating_add(TAG_LEN);
    let mut total = 0u64;
    let mut index = 0u64;

    loop {
        let mut prefix = [0u8; 5];
        read_exact_or_reject(input, &mut prefix, "stream truncated")?;
        let ct_len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        if ct_len < TAG_LEN || ct_len > max_ct_len {
            return Err(reject(&format!("chunk {} has invalid length", index)));
        }
        let mut ciphertext = vec![0u8; ct_len as usize];
        read_exact_or_reject(input, &mut ciphertext, "stream truncated")?;

        match prefix[4] {
            FLAG_MORE => {
                let plaintext = Zeroizing::new(opener.open_next(&ciphertext, &aad, index)?);
                output.write_all(&plaintext)?;
                total += plaintext.len() as u64;
            }
            FLAG_LAST => {
                let plaintext = Zeroizing::new(opener.open_last(&ciphertext, &aad, index)?);
                output.write_all(&plaintext)?;
                total += plaintext.len() as u64;
                break;
            }
            other => return Err(reject(&format!("chunk {} has invalid flag {}", index, other))),
        }
        index += 1;
    }

    let mut trailing = [0u8; 1];
    if read_full(input, &mut trailing)? != 0 {
        return Err(reject("data after final chunk"));
    }
    Ok(total)
}
