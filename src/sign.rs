//! Signing engine: local key signing and co-signer signature merging
//!
//! Signing walks every input's key slots and fills the ones whose
//! signer key has a known secret. Merging goes the other way: given a
//! co-signer's serialization of the same transaction, each foreign
//! signature is attributed to a key slot by public key recovery and
//! installed there.

use std::collections::HashMap;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::error::{ChainError, Result};
use crate::params::ChainParams;
use crate::transaction::SerializePurpose;
use crate::types::{ByteString, SignerKey, Transaction, TxInput};

/// Sign every unsigned slot whose signer key has a secret in `keypairs`.
///
/// A signed slot collapses to its plain public key, matching what a
/// finalized script reveals. Signatures are stored as DER without the
/// hashtype byte. The raw cache is refreshed so the transaction
/// serializes with its new signatures.
pub fn sign(
    tx: &mut Transaction,
    params: &ChainParams,
    keypairs: &HashMap<SignerKey, [u8; 32]>,
) -> Result<()> {
    let secp = Secp256k1::signing_only();
    for index in 0..tx.inputs.len() {
        let pending = pending_slots(&tx.inputs[index], keypairs);
        if pending.is_empty() {
            continue;
        }
        let digest = tx.signable_digest(params, index)?;
        let message = Message::from_digest_slice(&digest)?;
        for (slot, secret) in pending {
            let input = &tx.inputs[index];
            if input.signatures.iter().flatten().count() >= input.num_sig {
                break;
            }
            let secret_key = SecretKey::from_slice(&secret)?;
            let pubkey = PublicKey::from_secret_key(&secp, &secret_key);
            let encoded = match confirm_pubkey(input, slot, &pubkey) {
                Some(encoded) => encoded,
                None => {
                    log::warn!(
                        "Secret for input {} slot {} does not match the declared public key",
                        index,
                        slot
                    );
                    continue;
                }
            };
            let signature = secp.sign_ecdsa(&message, &secret_key);
            let input = &mut tx.inputs[index];
            input.signer_keys[slot] = SignerKey::Plain(encoded.clone());
            input.pubkeys[slot] = Some(encoded);
            input.signatures[slot] = Some(signature.serialize_der().to_vec());
            log::debug!("Added signature for input {} slot {}", index, slot);
        }
    }
    tx.raw = Some(tx.serialize(params, SerializePurpose::Finalize)?);
    Ok(())
}

/// Unsigned slots of one input whose signer key has a known secret.
fn pending_slots(
    input: &TxInput,
    keypairs: &HashMap<SignerKey, [u8; 32]>,
) -> Vec<(usize, [u8; 32])> {
    let mut pending = Vec::new();
    if input.num_sig == 0 {
        return pending;
    }
    for (slot, key) in input.signer_keys.iter().enumerate() {
        if matches!(input.signatures.get(slot), Some(Some(_))) {
            continue;
        }
        if let Some(secret) = keypairs.get(key) {
            pending.push((slot, *secret));
        }
    }
    pending
}

/// The slot's declared public key, when it matches the secret.
///
/// Slots that never resolved a public key accept the compressed form.
fn confirm_pubkey(input: &TxInput, slot: usize, pubkey: &PublicKey) -> Option<ByteString> {
    match input.pubkeys.get(slot) {
        Some(Some(declared)) => {
            if declared.as_slice() == pubkey.serialize().as_slice()
                || declared.as_slice() == pubkey.serialize_uncompressed().as_slice()
            {
                Some(declared.clone())
            } else {
                None
            }
        }
        _ => Some(pubkey.serialize().to_vec()),
    }
}

/// Fold a co-signer's serialization of this transaction into it.
///
/// Foreign signatures already present are skipped, so merging the same
/// source twice changes nothing. Signatures that match none of an
/// input's declared public keys are dropped.
pub fn merge_signatures(
    tx: &mut Transaction,
    params: &ChainParams,
    other_raw: &[u8],
) -> Result<()> {
    let other = Transaction::deserialize(params, other_raw)?;
    if other.inputs.len() != tx.inputs.len() {
        return Err(ChainError::SignatureMismatch(format!(
            "Cannot merge a transaction with {} inputs into one with {}",
            other.inputs.len(),
            tx.inputs.len()
        )));
    }
    let secp = Secp256k1::verification_only();
    for index in 0..tx.inputs.len() {
        let foreign: Vec<ByteString> = other.inputs[index]
            .signatures
            .iter()
            .flatten()
            .cloned()
            .collect();
        if foreign.is_empty() {
            continue;
        }
        let digest = tx.signable_digest(params, index)?;
        let message = Message::from_digest_slice(&digest)?;
        for der in foreign {
            let already_known = tx.inputs[index]
                .signatures
                .iter()
                .flatten()
                .any(|known| *known == der);
            if already_known {
                continue;
            }
            match matching_slot(&secp, &tx.inputs[index], &message, &der) {
                Some((slot, declared)) => {
                    let input = &mut tx.inputs[index];
                    if matches!(input.signatures.get(slot), Some(Some(_))) {
                        log::debug!("Input {} slot {} already signed", index, slot);
                        continue;
                    }
                    log::debug!("Merged signature for input {} slot {}", index, slot);
                    input.signatures[slot] = Some(der);
                    input.signer_keys[slot] = SignerKey::Plain(declared);
                }
                None => {
                    log::debug!(
                        "Dropping foreign signature on input {}: no declared key matches",
                        index
                    );
                }
            }
        }
    }
    tx.raw = Some(tx.serialize(params, SerializePurpose::Finalize)?);
    Ok(())
}

/// Attribute a DER signature to a key slot by public key recovery.
///
/// All four recovery ids are tried; the recovered key is matched against
/// the declared keys in both compressed and uncompressed form, and the
/// signature is verified (low-S normalized) before the slot is accepted.
fn matching_slot(
    secp: &Secp256k1<secp256k1::VerifyOnly>,
    input: &TxInput,
    message: &Message,
    der: &[u8],
) -> Option<(usize, ByteString)> {
    let parsed = Signature::from_der(der).ok()?;
    let compact = parsed.serialize_compact();
    let mut normalized = parsed;
    normalized.normalize_s();
    for recovery_id in 0..4 {
        let id = match RecoveryId::from_i32(recovery_id) {
            Ok(id) => id,
            Err(_) => continue,
        };
        let recoverable = match RecoverableSignature::from_compact(&compact, id) {
            Ok(signature) => signature,
            Err(_) => continue,
        };
        let candidate = match secp.recover_ecdsa(message, &recoverable) {
            Ok(key) => key,
            Err(_) => continue,
        };
        if secp.verify_ecdsa(message, &normalized, &candidate).is_err() {
            continue;
        }
        let compressed = candidate.serialize();
        let uncompressed = candidate.serialize_uncompressed();
        for (slot, declared) in input.pubkeys.iter().enumerate() {
            let declared = match declared {
                Some(bytes) => bytes,
                None => continue,
            };
            if declared.as_slice() == compressed.as_slice()
                || declared.as_slice() == uncompressed.as_slice()
            {
                return Some((slot, declared.clone()));
            }
        }
    }
    None
}
