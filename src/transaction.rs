//! Transaction codec: wire parsing with chain extras, purpose-driven
//! serialization and signing digests
//!
//! Deserialization decodes the generic layout (version, inputs, outputs,
//! lock time) and splices each chain's extra fields at their fixed
//! positions. Input scripts are decoded into signing metadata where they
//! match a known spend template; anything else round-trips verbatim.
//! Serialization is driven by a purpose: sizing a fee, finalizing for
//! broadcast, or building the digest preimage for one input.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ChainError, Result};
use crate::hashes::{hash_to_hex, sha256d};
use crate::keys;
use crate::params::ChainParams;
use crate::script::{self, ScriptOp, OP_0, OP_1, OP_16, OP_CHECKMULTISIG, TEMPLATE_PUSH};
use crate::stream::{DataStream, DataWriter};
use crate::types::{ByteString, Hash32, OutputScript, SignerKey, Transaction, TxInput, TxOutput};

/// Wire marker for a signature slot not yet filled.
pub const NO_SIGNATURE: u8 = 0xff;

/// Every signature commits to the whole transaction.
pub const SIGHASH_ALL: u8 = 0x01;

/// Worst-case DER signature length assumed when sizing fees.
const PLACEHOLDER_SIG_LEN: usize = 0x48;

/// What a serialization is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializePurpose {
    /// Placeholder signatures of worst-case size, to estimate fees.
    Estimate,
    /// Real signatures where known; tagged signer keys and
    /// missing-signature markers where not.
    Finalize,
    /// Digest preimage for signing one input: it carries its redeem or
    /// locking script, every other input is empty, and the hashtype
    /// dword is appended.
    SignFor(usize),
}

impl Transaction {
    /// Unsigned transaction from prepared inputs and outputs.
    pub fn from_io(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
            timestamp: None,
            message: None,
            raw: None,
        }
    }

    /// Decode a raw transaction under a chain's layout.
    ///
    /// Signing metadata that fails to parse leaves the affected input
    /// bare; the transaction itself still decodes.
    pub fn deserialize(params: &ChainParams, raw: &[u8]) -> Result<Transaction> {
        let mut stream = DataStream::new(raw);
        let version = stream.read_i32()?;
        let timestamp = if params.has_timestamp_extra() {
            Some(stream.read_u32()?)
        } else {
            None
        };
        let input_count = stream.read_compact_size()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            inputs.push(parse_input(params, &mut stream)?);
        }
        let output_count = stream.read_compact_size()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            outputs.push(parse_output(params, &mut stream)?);
        }
        let lock_time = stream.read_u32()?;
        let message = match params.trailing_message_min_version() {
            Some(min_version) if version >= min_version => {
                Some(stream.read_var_bytes()?.to_vec())
            }
            _ => None,
        };
        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            timestamp,
            message,
            raw: Some(raw.to_vec()),
        })
    }

    pub fn serialize(&self, params: &ChainParams, purpose: SerializePurpose) -> Result<ByteString> {
        let mut writer = DataWriter::new();
        writer.write_i32(self.version);
        if params.has_timestamp_extra() {
            writer.write_u32(self.timestamp.unwrap_or_else(current_unix_time));
        }
        writer.write_compact_size(self.inputs.len() as u64);
        for (index, input) in self.inputs.iter().enumerate() {
            writer.write_bytes(&input.prevout_hash);
            writer.write_u32(input.prevout_n);
            writer.write_var_bytes(&input_script(params, input, index, purpose)?);
            writer.write_u32(input.sequence);
        }
        writer.write_compact_size(self.outputs.len() as u64);
        for output in &self.outputs {
            writer.write_u64(output.value);
            writer.write_var_bytes(&script::pay_script(params, &output.script)?);
        }
        writer.write_u32(self.lock_time);
        if let Some(min_version) = params.trailing_message_min_version() {
            if self.version >= min_version {
                writer.write_var_bytes(self.message.as_deref().unwrap_or(&[]));
            }
        }
        if let SerializePurpose::SignFor(_) = purpose {
            writer.write_u32(SIGHASH_ALL as u32);
        }
        Ok(writer.into_bytes())
    }

    /// Finalized serialization, cached until the next mutation.
    pub fn raw_bytes(&mut self, params: &ChainParams) -> Result<ByteString> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let raw = self.serialize(params, SerializePurpose::Finalize)?;
        self.raw = Some(raw.clone());
        Ok(raw)
    }

    /// Digest the signature for input `index` commits to.
    pub fn signable_digest(&self, params: &ChainParams, index: usize) -> Result<Hash32> {
        let preimage = self.serialize(params, SerializePurpose::SignFor(index))?;
        Ok(sha256d(&preimage))
    }

    /// Transaction id: finalized serialization double-hashed, display order.
    pub fn txid(&self, params: &ChainParams) -> Result<String> {
        let raw = match &self.raw {
            Some(raw) => raw.clone(),
            None => self.serialize(params, SerializePurpose::Finalize)?,
        };
        Ok(hash_to_hex(&sha256d(&raw)))
    }

    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
        self.raw = None;
    }

    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
        self.raw = None;
    }

    /// Signatures present and required across all non-coinbase inputs.
    pub fn signature_count(&self) -> (usize, usize) {
        let mut present = 0;
        let mut required = 0;
        for input in &self.inputs {
            if input.is_coinbase() {
                continue;
            }
            present += input.signatures.iter().flatten().count();
            required += input.num_sig;
        }
        (present, required)
    }

    pub fn is_complete(&self) -> bool {
        let (present, required) = self.signature_count();
        present == required
    }

    /// Signer keys that still owe a signature somewhere.
    pub fn inputs_to_sign(&self) -> HashSet<SignerKey> {
        let mut pending = HashSet::new();
        for input in &self.inputs {
            let present = input.signatures.iter().flatten().count();
            if input.num_sig == 0 || present >= input.num_sig {
                continue;
            }
            for (slot, key) in input.signer_keys.iter().enumerate() {
                if matches!(input.signatures.get(slot), Some(Some(_))) {
                    continue;
                }
                pending.insert(key.clone());
            }
        }
        pending
    }

    /// Deterministic lexicographic ordering of inputs and outputs
    /// (BIP-69), so cooperating signers produce identical digests.
    pub fn sort_bip69(&mut self, params: &ChainParams) -> Result<()> {
        self.inputs.sort_by_key(|input| {
            let mut display = input.prevout_hash;
            display.reverse();
            (display, input.prevout_n)
        });
        let mut keyed: Vec<(u64, ByteString, TxOutput)> = Vec::with_capacity(self.outputs.len());
        for output in self.outputs.drain(..) {
            let script = script::pay_script(params, &output.script)?;
            keyed.push((output.value, script, output));
        }
        keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        self.outputs = keyed.into_iter().map(|(_, _, output)| output).collect();
        self.raw = None;
        Ok(())
    }

    /// Summary object in the shape RPC consumers expect.
    pub fn summary(&mut self, params: &ChainParams) -> Result<serde_json::Value> {
        let raw = self.raw_bytes(params)?;
        Ok(serde_json::json!({
            "hex": hex::encode(raw),
            "complete": self.is_complete(),
        }))
    }
}

fn current_unix_time() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or(0)
}

fn parse_input(params: &ChainParams, stream: &mut DataStream) -> Result<TxInput> {
    let prevout_hash = stream.read_hash32()?;
    let prevout_n = stream.read_u32()?;
    let script_sig = stream.read_var_bytes()?.to_vec();
    let sequence = stream.read_u32()?;
    let mut input = TxInput::new(prevout_hash, prevout_n);
    input.script_sig = script_sig;
    input.sequence = sequence;
    if !input.is_coinbase() && !input.script_sig.is_empty() {
        if let Err(err) = attach_signing_metadata(params, &mut input) {
            log::debug!(
                "Input script {} kept raw: {}",
                hex::encode(&input.script_sig),
                err
            );
        }
    }
    Ok(input)
}

fn parse_output(params: &ChainParams, stream: &mut DataStream) -> Result<TxOutput> {
    let value = stream.read_u64()?;
    let script = stream.read_var_bytes()?;
    Ok(TxOutput {
        value,
        script: script::classify_output_script(params, script),
    })
}

/// Decode a signature script into the input's signing metadata.
///
/// Recognized spends: a bare push (pay-to-pubkey, carries no metadata),
/// signature plus signer key (pay-to-pubkey-hash), and OP_0 followed by
/// signature slots and a redeem script (p2sh multisig). The input is
/// only modified when the whole script decodes.
fn attach_signing_metadata(params: &ChainParams, input: &mut TxInput) -> Result<()> {
    let ops = script::decode_script(&input.script_sig)?;

    if script::match_template(&ops, &[TEMPLATE_PUSH]) {
        return Ok(());
    }

    if script::match_template(&ops, &[TEMPLATE_PUSH, TEMPLATE_PUSH]) {
        let signature = parse_wire_signature(push_data(&ops, 0)?)?;
        let key = keys::parse_signer_key(push_data(&ops, 1)?)?;
        let (pubkey, address) = keys::resolve(&key, params)?;
        input.address = Some(address);
        input.num_sig = 1;
        input.signer_keys = vec![key];
        input.pubkeys = vec![pubkey];
        input.signatures = vec![signature];
        return Ok(());
    }

    let mut template = vec![OP_0];
    template.resize(ops.len(), TEMPLATE_PUSH);
    if ops.len() < 2 || !script::match_template(&ops, &template) {
        return Err(ChainError::MalformedScript(
            "No spend template matches".to_string(),
        ));
    }

    let (num_sig, signer_keys) = decode_redeem_script(push_data(&ops, ops.len() - 1)?)?;
    let slots = signer_keys.len();
    let mut pubkeys = Vec::with_capacity(slots);
    let mut plain = Vec::with_capacity(slots);
    for key in &signer_keys {
        let (resolved, _) = keys::resolve(key, params)?;
        let resolved = resolved.ok_or_else(|| {
            ChainError::KeyDerivation("Multisig key slot has no resolvable public key".to_string())
        })?;
        plain.push(resolved.clone());
        pubkeys.push(Some(resolved));
    }
    let redeem = script::multisig_script(&plain, num_sig)?;

    let mut signatures = Vec::with_capacity(slots);
    for op in &ops[1..ops.len() - 1] {
        signatures.push(parse_wire_signature(op.data.unwrap_or(&[]))?);
    }
    if signatures.len() > slots {
        return Err(ChainError::MalformedScript(format!(
            "{} signature slots for {} keys",
            signatures.len(),
            slots
        )));
    }
    // A finalized input omits the slots that never signed.
    signatures.resize(slots, None);

    input.address = Some(script::redeem_script_address(params, &redeem));
    input.num_sig = num_sig;
    input.signer_keys = signer_keys;
    input.pubkeys = pubkeys;
    input.signatures = signatures;
    input.redeem_script = Some(redeem);
    Ok(())
}

/// Decode `OP_m, key pushes, OP_n, OP_CHECKMULTISIG`.
fn decode_redeem_script(redeem: &[u8]) -> Result<(usize, Vec<SignerKey>)> {
    let ops = script::decode_script(redeem)?;
    if ops.len() < 4 {
        return Err(ChainError::MalformedScript(
            "Redeem script too short for multisig".to_string(),
        ));
    }
    let m = op_number_value(ops[0].opcode)?;
    let n = op_number_value(ops[ops.len() - 2].opcode)?;
    let mut template = vec![ops[0].opcode];
    template.resize(1 + n, TEMPLATE_PUSH);
    template.push(ops[ops.len() - 2].opcode);
    template.push(OP_CHECKMULTISIG);
    if !script::match_template(&ops, &template) {
        return Err(ChainError::MalformedScript(
            "Redeem script is not an m-of-n checkmultisig".to_string(),
        ));
    }
    if m > n {
        return Err(ChainError::MalformedScript(format!(
            "Redeem script wants {} signatures from {} keys",
            m, n
        )));
    }
    let keys = ops[1..=n]
        .iter()
        .map(|op| keys::parse_signer_key(op.data.unwrap_or(&[])))
        .collect::<Result<Vec<_>>>()?;
    Ok((m, keys))
}

fn op_number_value(opcode: u8) -> Result<usize> {
    if (OP_1..=OP_16).contains(&opcode) {
        Ok((opcode - OP_1 + 1) as usize)
    } else {
        Err(ChainError::MalformedScript(format!(
            "Opcode {:#04x} is not a small number",
            opcode
        )))
    }
}

fn push_data<'a>(ops: &[ScriptOp<'a>], index: usize) -> Result<&'a [u8]> {
    ops.get(index).and_then(|op| op.data).ok_or_else(|| {
        ChainError::MalformedScript(format!("Expected push at script position {}", index))
    })
}

/// A pushed signature is DER plus the hashtype byte, or the one-byte
/// missing-signature marker.
fn parse_wire_signature(data: &[u8]) -> Result<Option<ByteString>> {
    if data == [NO_SIGNATURE] {
        return Ok(None);
    }
    match data.split_last() {
        Some((&SIGHASH_ALL, der)) if !der.is_empty() => Ok(Some(der.to_vec())),
        _ => Err(ChainError::MalformedScript(
            "Signature push lacks the hashtype byte".to_string(),
        )),
    }
}

fn with_hashtype(der: &[u8]) -> ByteString {
    let mut out = der.to_vec();
    out.push(SIGHASH_ALL);
    out
}

/// Signature script of one input for a given purpose.
///
/// Inputs without signing metadata (coinbase or unrecognized spends)
/// emit their stored script verbatim and cannot be signed for.
fn input_script(
    params: &ChainParams,
    input: &TxInput,
    index: usize,
    purpose: SerializePurpose,
) -> Result<ByteString> {
    if let SerializePurpose::SignFor(signing) = purpose {
        if signing != index {
            return Ok(Vec::new());
        }
        return signing_script(params, input);
    }
    if !input.has_metadata() {
        return Ok(input.script_sig.clone());
    }

    let p2sh = input.redeem_script.is_some();
    let num_sig = if p2sh { input.num_sig } else { 1 };
    let present = input.signatures.iter().flatten().count();
    let complete = present >= num_sig;
    let estimate = matches!(purpose, SerializePurpose::Estimate);

    let mut out = Vec::new();
    if estimate {
        for _ in 0..num_sig {
            out.extend_from_slice(&script::push_script(&[0u8; PLACEHOLDER_SIG_LEN]));
        }
    } else if complete {
        for der in input.signatures.iter().flatten() {
            out.extend_from_slice(&script::push_script(&with_hashtype(der)));
        }
    } else {
        for slot in &input.signatures {
            match slot {
                Some(der) => out.extend_from_slice(&script::push_script(&with_hashtype(der))),
                None => out.extend_from_slice(&script::push_script(&[NO_SIGNATURE])),
            }
        }
    }

    if p2sh {
        // Complete spends reveal the plain redeem script; partial ones
        // carry the tagged keys so co-signers can keep deriving.
        let redeem_keys: Vec<ByteString> = if estimate || complete {
            resolved_pubkeys(input)?
        } else {
            input
                .signer_keys
                .iter()
                .map(keys::encode_signer_key)
                .collect()
        };
        let redeem = script::multisig_script(&redeem_keys, num_sig)?;
        let mut full = vec![OP_0];
        full.extend_from_slice(&out);
        full.extend_from_slice(&script::push_script(&redeem));
        return Ok(full);
    }

    let key_bytes = if estimate || complete {
        match input.pubkeys.first().cloned().flatten() {
            Some(pubkey) => pubkey,
            None => fallback_key_bytes(input)?,
        }
    } else {
        match input.signer_keys.first() {
            Some(key) => keys::encode_signer_key(key),
            None => {
                return Err(ChainError::Serialization(
                    "Input has no signer key".to_string(),
                ))
            }
        }
    };
    out.extend_from_slice(&script::push_script(&key_bytes));
    Ok(out)
}

/// Script the signature commits to: the redeem script for p2sh, the
/// address's locking script otherwise.
fn signing_script(params: &ChainParams, input: &TxInput) -> Result<ByteString> {
    if let Some(redeem) = &input.redeem_script {
        return Ok(redeem.clone());
    }
    let address = input.address.as_ref().ok_or_else(|| {
        ChainError::Serialization(
            "Input carries no address to build its signing script".to_string(),
        )
    })?;
    script::pay_script(params, &OutputScript::Address(address.clone()))
}

fn resolved_pubkeys(input: &TxInput) -> Result<Vec<ByteString>> {
    input
        .pubkeys
        .iter()
        .map(|entry| {
            entry.clone().ok_or_else(|| {
                ChainError::KeyDerivation(
                    "Multisig redeem script needs every public key resolved".to_string(),
                )
            })
        })
        .collect()
}

/// Address-only stand-in when an input knows its address but not its key.
fn fallback_key_bytes(input: &TxInput) -> Result<ByteString> {
    let address = input.address.as_ref().ok_or_else(|| {
        ChainError::Serialization("Input has neither public key nor address".to_string())
    })?;
    Ok(keys::encode_signer_key(&keys::address_stub(address)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::bitcoin;
    use crate::hashes::hash_from_hex;

    #[test]
    fn test_parse_wire_signature_forms() {
        assert_eq!(parse_wire_signature(&[NO_SIGNATURE]).unwrap(), None);
        let der = vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01];
        let sig = parse_wire_signature(&with_hashtype(&der)).unwrap();
        assert_eq!(sig, Some(der));
        // No hashtype byte
        assert!(parse_wire_signature(&[0x30, 0x02]).is_err());
        assert!(parse_wire_signature(&[SIGHASH_ALL]).is_err());
        assert!(parse_wire_signature(&[]).is_err());
    }

    #[test]
    fn test_decode_redeem_script_shapes() {
        let key_a =
            hex::decode("02ee780aa224c9fe54caff984205077b7cca08ced3188a3f3c639d83deda6b9a59")
                .unwrap();
        let key_b =
            hex::decode("03124429ddbed55593d0abea0d0d3d283eca4546e40017b2945f4666c561b494ba")
                .unwrap();
        let redeem = script::multisig_script(&[key_a.clone(), key_b.clone()], 2).unwrap();
        let (m, keys) = decode_redeem_script(&redeem).unwrap();
        assert_eq!(m, 2);
        assert_eq!(keys, vec![SignerKey::Plain(key_a), SignerKey::Plain(key_b)]);

        assert!(decode_redeem_script(&[OP_1, OP_CHECKMULTISIG]).is_err());
        // Claimed key count larger than the actual pushes
        let wrong = vec![OP_1, 0x01, 0xaa, OP_1 + 2, OP_CHECKMULTISIG];
        assert!(decode_redeem_script(&wrong).is_err());
    }

    #[test]
    fn test_unrecognized_script_round_trips_verbatim() {
        let raw_script = vec![0x6a, 0x01, 0xaa];
        let mut input = TxInput::new([0x11; 32], 1);
        input.script_sig = raw_script.clone();
        let tx = Transaction::from_io(vec![input], Vec::new());
        assert!(!tx.inputs[0].has_metadata());
        let bytes = tx
            .serialize(&bitcoin::PARAMS, SerializePurpose::Finalize)
            .unwrap();
        let parsed = Transaction::deserialize(&bitcoin::PARAMS, &bytes).unwrap();
        assert_eq!(parsed.inputs[0].script_sig, raw_script);
        assert!(tx.signable_digest(&bitcoin::PARAMS, 0).is_err());
    }

    #[test]
    fn test_bare_push_carries_no_metadata() {
        let mut script_sig = vec![0x47];
        script_sig.extend_from_slice(&[0u8; 0x47]);
        let mut input = TxInput::new([0x22; 32], 0);
        input.script_sig = script_sig.clone();
        let mut probe = input.clone();
        attach_signing_metadata(&bitcoin::PARAMS, &mut probe).unwrap();
        assert_eq!(probe, input);
    }

    #[test]
    fn test_signature_count_skips_coinbase() {
        let mut coinbase = TxInput::new([0u8; 32], 0xffffffff);
        coinbase.script_sig = vec![0x01, 0x02];
        let mut signed = TxInput::new([0x33; 32], 0);
        signed.num_sig = 2;
        signed.signatures = vec![Some(vec![0x30]), None, None];
        let tx = Transaction::from_io(vec![coinbase, signed], Vec::new());
        assert_eq!(tx.signature_count(), (1, 2));
        assert!(!tx.is_complete());
    }

    #[test]
    fn test_from_io_defaults_and_cache_invalidation() {
        let mut tx = Transaction::from_io(Vec::new(), Vec::new());
        assert_eq!(tx.version, 1);
        assert_eq!(tx.lock_time, 0);
        let raw = tx.raw_bytes(&bitcoin::PARAMS).unwrap();
        assert_eq!(tx.raw.as_deref(), Some(raw.as_slice()));
        tx.add_output(TxOutput {
            value: 1000,
            script: OutputScript::Raw(Vec::new()),
        });
        assert!(tx.raw.is_none());
    }

    #[test]
    fn test_sort_bip69_orders_by_display_hash() {
        let first =
            hash_from_hex("1111111111111111111111111111111111111111111111111111111111111111")
                .unwrap();
        let second =
            hash_from_hex("2222222222222222222222222222222222222222222222222222222222222222")
                .unwrap();
        let mut tx = Transaction::from_io(
            vec![
                TxInput::new(second, 0),
                TxInput::new(first, 7),
                TxInput::new(first, 2),
            ],
            vec![
                TxOutput {
                    value: 5,
                    script: OutputScript::Raw(vec![0xbb]),
                },
                TxOutput {
                    value: 5,
                    script: OutputScript::Raw(vec![0xaa]),
                },
                TxOutput {
                    value: 1,
                    script: OutputScript::Raw(vec![0xcc]),
                },
            ],
        );
        tx.sort_bip69(&bitcoin::PARAMS).unwrap();
        assert_eq!(tx.inputs[0].prevout_hash, first);
        assert_eq!(tx.inputs[0].prevout_n, 2);
        assert_eq!(tx.inputs[1].prevout_n, 7);
        assert_eq!(tx.inputs[2].prevout_hash, second);
        assert_eq!(tx.outputs[0].value, 1);
        assert_eq!(tx.outputs[1].script, OutputScript::Raw(vec![0xaa]));
        assert_eq!(tx.outputs[2].script, OutputScript::Raw(vec![0xbb]));
    }

    #[test]
    fn test_estimate_placeholder_length() {
        let mut input = TxInput::new([0x44; 32], 0);
        input.address = Some("1446oU3z268EeFgfcwJv6X2VBXHfoYxfuD".to_string());
        input.num_sig = 1;
        input.signer_keys =
            vec![keys::address_stub("1446oU3z268EeFgfcwJv6X2VBXHfoYxfuD").unwrap()];
        input.pubkeys = vec![None];
        input.signatures = vec![None];
        let script = input_script(&bitcoin::PARAMS, &input, 0, SerializePurpose::Estimate).unwrap();
        // One 0x48-byte placeholder push plus the address stub push
        assert_eq!(script.len(), 1 + PLACEHOLDER_SIG_LEN + 1 + 22);
    }
}
