// OpenPGP streaming encrypt/decrypt (SEIPD v1, AES-256)

use cryptq_core::port::ProcessingError;
use pgp::composed::{Message, MessageBuilder};
use pgp::crypto::hash::HashAlgorithm;
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use std::fmt::Debug;
use std::io::{BufRead, Read, Write};
use zeroize::Zeroizing;

use crate::io::copy_stream;
use crate::keys::{Recipient, UnlockedKey};

const ARMOR_PREFIX: &[u8] = b"-----BEGIN PGP";

/// Encrypt `input` to the recipient, optionally signing in the same pass (binary output)
pub(crate) fn encrypt<R, W>(
    input: R,
    file_name: &str,
    recipient: &Recipient,
    signer: Option<&UnlockedKey>,
    output: W,
) -> Result<(), ProcessingError>
where
    R: Read,
    W: Write,
{
    let mut rng = rand::thread_rng();
    let mut builder = MessageBuilder::from_reader(file_name.to_string(), input)
        .seipd_v1(&mut rng, SymmetricKeyAlgorithm::AES256);
    builder
        .encrypt_to_key(&mut rng, recipient.encryption_subkey())
        .map_err(|e| ProcessingError::InvalidKey(format!("cannot encrypt to key: {}", e)))?;
    if let Some(signer) = signer {
        builder.sign(
            &signer.key.primary_key,
            pgp::types::Password::Static(signer.password.read()),
            HashAlgorithm::Sha256,
        );
    }

    builder
        .to_writer(&mut rng, output)
        .map_err(|e| ProcessingError::StreamIo(format!("OpenPGP encryption failed: {}", e)))
}

/// Decrypt a binary or ASCII-armored message into `output`; returns plaintext bytes
pub(crate) fn decrypt<'a, R, W>(
    mut input: R,
    key: &UnlockedKey,
    output: &mut W,
    buffer_size: usize,
) -> Result<u64, ProcessingError>
where
    R: BufRead + Debug + Send + 'a,
    W: Write + ?Sized,
{
    let armored = input.fill_buf()?.starts_with(ARMOR_PREFIX);
    let mut message = open(input, armored, key)?;
    copy_stream(&mut message, output, buffer_size, |e| {
        ProcessingError::DecryptionFailed(format!("OpenPGP stream rejected: {}", e))
    })
}

/// Wrap a session key as a small OpenPGP message to the recipient
pub(crate) fn wrap_session_key(
    session_key: &[u8],
    recipient: &Recipient,
    signer: Option<&UnlockedKey>,
) -> Result<Vec<u8>, ProcessingError> {
    let mut wrapped = Vec::new();
    encrypt(session_key, "", recipient, signer, &mut wrapped)?;
    Ok(wrapped)
}

/// Recover a session key wrapped by `wrap_session_key`
pub(crate) fn unwrap_session_key(
    wrapped: &[u8],
    key: &UnlockedKey,
) -> Result<Zeroizing<Vec<u8>>, ProcessingError> {
    let mut message = open(wrapped, false, key)?;
    let mut session_key = Zeroizing::new(Vec::new());
    message.read_to_end(&mut session_key).map_err(|e| {
        ProcessingError::DecryptionFailed(format!("session key unreadable: {}", e))
    })?;
    Ok(session_key)
}

/// Parse, decrypt and (if needed) decompress down to the literal data
fn open<'a, R>(input: R, armored: bool, key: &UnlockedKey) -> Result<Message<'a>, ProcessingError>
where
    R: BufRead + Debug + Send + 'a,
{
    let parsed = if armored {
        Message::from_armor(input).map(|(m, _headers)| m)
    } else {
        Message::from_bytes(input)
    };
    let message = parsed.map_err(|e| {
        ProcessingError::DecryptionFailed(format!("not an OpenPGP message: {}", e))
    })?;

    let mut message = message.decrypt(&key.password, &key.key).map_err(|e| {
        ProcessingError::DecryptionFailed(format!("no session key for this secret key: {}", e))
    })?;
    if message.is_compressed() {
        message = message.decompress().map_err(|e| {
            ProcessingError::DecryptionFailed(format!("cannot decompress message: {}", e))
        })?;
    }
    Ok(message)
}
