//! Script decoding, template matching and script builders
//!
//! Scripts are never executed here. Decoding yields an opcode/push
//! sequence, and classification works by matching that sequence against
//! the handful of standard templates a wallet cares about.

use crate::address;
use crate::error::{ChainError, Result};
use crate::params::ChainParams;
use crate::types::{ByteString, OutputScript};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Template wildcard matching any non-empty push opcode
pub const TEMPLATE_PUSH: u8 = OP_PUSHDATA4;

/// One decoded script element: the opcode, plus its payload for pushes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOp<'a> {
    pub opcode: u8,
    pub data: Option<&'a [u8]>,
}

/// Decode a script into opcodes and push payloads
///
/// A push whose payload (or length prefix) runs past the end of the
/// script is malformed.
pub fn decode_script(script: &[u8]) -> Result<Vec<ScriptOp<'_>>> {
    let mut ops = Vec::new();
    let mut i = 0usize;
    while i < script.len() {
        let opcode = script[i];
        i += 1;
        if opcode > OP_PUSHDATA4 {
            ops.push(ScriptOp { opcode, data: None });
            continue;
        }
        let len = match opcode {
            OP_PUSHDATA1 => {
                let b = take(script, i, 1)?;
                i += 1;
                b[0] as usize
            }
            OP_PUSHDATA2 => {
                let b = take(script, i, 2)?;
                i += 2;
                u16::from_le_bytes([b[0], b[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let b = take(script, i, 4)?;
                i += 4;
                u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
            }
            direct => direct as usize,
        };
        let data = take(script, i, len)?;
        i += len;
        ops.push(ScriptOp {
            opcode,
            data: Some(data),
        });
    }
    Ok(ops)
}

fn take(script: &[u8], at: usize, len: usize) -> Result<&[u8]> {
    if script.len() < at + len {
        return Err(ChainError::MalformedScript(format!(
            "Truncated push of {} bytes at offset {}",
            len, at
        )));
    }
    Ok(&script[at..at + len])
}

/// Match decoded ops against a template
///
/// `TEMPLATE_PUSH` entries match any push opcode other than OP_0;
/// every other entry must match the opcode exactly.
pub fn match_template(ops: &[ScriptOp], template: &[u8]) -> bool {
    if ops.len() != template.len() {
        return false;
    }
    ops.iter().zip(template.iter()).all(|(op, &want)| {
        if want == TEMPLATE_PUSH {
            op.opcode > OP_0 && op.opcode <= OP_PUSHDATA4
        } else {
            op.opcode == want
        }
    })
}

/// Push-length opcode prefix for a payload of `len` bytes
pub fn op_push(len: usize) -> ByteString {
    if len < OP_PUSHDATA1 as usize {
        vec![len as u8]
    } else if len < 0xff {
        vec![OP_PUSHDATA1, len as u8]
    } else if len < 0xffff {
        let mut v = vec![OP_PUSHDATA2];
        v.extend_from_slice(&(len as u16).to_le_bytes());
        v
    } else {
        let mut v = vec![OP_PUSHDATA4];
        v.extend_from_slice(&(len as u32).to_le_bytes());
        v
    }
}

/// Push opcode plus payload
pub fn push_script(data: &[u8]) -> ByteString {
    let mut script = op_push(data.len());
    script.extend_from_slice(data);
    script
}

fn op_number(x: usize) -> u8 {
    OP_1 + (x as u8) - 1
}

/// Build an m-of-n multisig redeem script from public keys
pub fn multisig_script(pubkeys: &[ByteString], m: usize) -> Result<ByteString> {
    let n = pubkeys.len();
    if n > 15 {
        return Err(ChainError::MalformedScript(format!(
            "Multisig supports at most 15 keys, got {}",
            n
        )));
    }
    if m == 0 || m > n {
        return Err(ChainError::MalformedScript(format!(
            "Invalid multisig threshold {} of {}",
            m, n
        )));
    }
    let mut script = vec![op_number(m)];
    for pubkey in pubkeys {
        script.extend_from_slice(&push_script(pubkey));
    }
    script.push(op_number(n));
    script.push(OP_CHECKMULTISIG);
    Ok(script)
}

/// p2sh address of a redeem script under the chain's p2sh version byte
pub fn redeem_script_address(params: &ChainParams, redeem_script: &[u8]) -> String {
    address::hash160_to_address(&crate::hashes::hash160(redeem_script), params.p2sh_version)
}

/// Classify an output locking script against the standard templates
///
/// Anything that is not pay-to-pubkey, pay-to-pubkey-hash or
/// pay-to-script-hash is preserved as raw bytes so re-serialization
/// cannot lose information.
pub fn classify_output_script(params: &ChainParams, script: &[u8]) -> OutputScript {
    let ops = match decode_script(script) {
        Ok(ops) => ops,
        Err(_) => return OutputScript::Raw(script.to_vec()),
    };

    if match_template(&ops, &[TEMPLATE_PUSH, OP_CHECKSIG]) {
        if let Some(data) = ops[0].data {
            return OutputScript::Pubkey(data.to_vec());
        }
    }

    if match_template(
        &ops,
        &[OP_DUP, OP_HASH160, TEMPLATE_PUSH, OP_EQUALVERIFY, OP_CHECKSIG],
    ) {
        if let Some(h160) = hash_payload(ops[2].data) {
            return OutputScript::Address(address::hash160_to_address(
                &h160,
                params.p2pkh_version,
            ));
        }
    }

    if match_template(&ops, &[OP_HASH160, TEMPLATE_PUSH, OP_EQUAL]) {
        if let Some(h160) = hash_payload(ops[1].data) {
            return OutputScript::Address(address::hash160_to_address(&h160, params.p2sh_version));
        }
    }

    OutputScript::Raw(script.to_vec())
}

fn hash_payload(data: Option<&[u8]>) -> Option<[u8; 20]> {
    let data = data?;
    if data.len() != 20 {
        return None;
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(data);
    Some(out)
}

/// Build the locking script for a classified output
pub fn pay_script(params: &ChainParams, output: &OutputScript) -> Result<ByteString> {
    match output {
        OutputScript::Raw(bytes) => Ok(bytes.clone()),
        OutputScript::Pubkey(pubkey) => {
            let mut script = push_script(pubkey);
            script.push(OP_CHECKSIG);
            Ok(script)
        }
        OutputScript::Address(addr) => {
            let (version, h160) = address::address_to_hash160(addr)?;
            if version == params.p2pkh_version {
                let mut script = vec![OP_DUP, OP_HASH160];
                script.extend_from_slice(&push_script(&h160));
                script.push(OP_EQUALVERIFY);
                script.push(OP_CHECKSIG);
                Ok(script)
            } else if version == params.p2sh_version {
                let mut script = vec![OP_HASH160];
                script.extend_from_slice(&push_script(&h160));
                script.push(OP_EQUAL);
                Ok(script)
            } else {
                Err(ChainError::Serialization(format!(
                    "Address version {} is not payable on {}",
                    version, params.code
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::bitcoin;

    #[test]
    fn test_op_push_boundaries() {
        assert_eq!(op_push(0x4b), vec![0x4b]);
        assert_eq!(op_push(0x4c), vec![0x4c, 0x4c]);
        assert_eq!(op_push(0xfe), vec![0x4c, 0xfe]);
        // 255 takes the two-byte length form
        assert_eq!(op_push(0xff), vec![0x4d, 0xff, 0x00]);
        assert_eq!(op_push(0xffff), vec![0x4e, 0xff, 0xff, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_rejects_truncated_push() {
        // Direct push of 5 bytes, only 2 present
        assert!(decode_script(&[0x05, 0xaa, 0xbb]).is_err());
        // OP_PUSHDATA1 with missing length byte
        assert!(decode_script(&[0x4c]).is_err());
    }

    #[test]
    fn test_decode_op_0_is_empty_push() {
        let ops = decode_script(&[OP_0]).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].opcode, OP_0);
        assert_eq!(ops[0].data, Some(&[][..]));
    }

    #[test]
    fn test_template_push_excludes_op_0() {
        let ops = decode_script(&[OP_0]).unwrap();
        assert!(!match_template(&ops, &[TEMPLATE_PUSH]));
        let ops = decode_script(&[0x01, 0xaa]).unwrap();
        assert!(match_template(&ops, &[TEMPLATE_PUSH]));
    }

    #[test]
    fn test_multisig_script_matches_known_redeem() {
        let pubkeys = vec![
            hex::decode("02ee780aa224c9fe54caff984205077b7cca08ced3188a3f3c639d83deda6b9a59")
                .unwrap(),
            hex::decode("03124429ddbed55593d0abea0d0d3d283eca4546e40017b2945f4666c561b494ba")
                .unwrap(),
        ];
        let redeem = multisig_script(&pubkeys, 2).unwrap();
        assert_eq!(
            hex::encode(&redeem),
            "522102ee780aa224c9fe54caff984205077b7cca08ced3188a3f3c639d83deda6b9a5921\
             03124429ddbed55593d0abea0d0d3d283eca4546e40017b2945f4666c561b494ba52ae"
        );
        assert_eq!(
            redeem_script_address(&bitcoin::PARAMS, &redeem),
            "3MqemPAHZDGLr537QBvU7i4dRFY3Xvad7X"
        );
    }

    #[test]
    fn test_multisig_script_limits() {
        let key = hex::decode("02ee780aa224c9fe54caff984205077b7cca08ced3188a3f3c639d83deda6b9a59")
            .unwrap();
        assert!(multisig_script(&vec![key.clone(); 16], 2).is_err());
        assert!(multisig_script(&vec![key.clone(); 3], 4).is_err());
        assert!(multisig_script(&vec![key; 3], 0).is_err());
    }

    #[test]
    fn test_classify_p2pkh() {
        let script = hex::decode("76a914230ac37834073a42146f11ef8414ae929feaafc388ac").unwrap();
        let classified = classify_output_script(&bitcoin::PARAMS, &script);
        assert_eq!(
            classified,
            OutputScript::Address("14CHYaaByjJZpx4oHBpfDMdqhTyXnZ3kVs".to_string())
        );
        // Rebuilding the script from the address is lossless.
        assert_eq!(pay_script(&bitcoin::PARAMS, &classified).unwrap(), script);
    }

    #[test]
    fn test_classify_non_standard_is_raw() {
        let script = vec![OP_DUP, OP_DUP, OP_DUP];
        assert_eq!(
            classify_output_script(&bitcoin::PARAMS, &script),
            OutputScript::Raw(script.clone())
        );
        assert_eq!(
            pay_script(&bitcoin::PARAMS, &OutputScript::Raw(script.clone())).unwrap(),
            script
        );
    }

    #[test]
    fn test_classify_p2pkh_with_wrong_hash_length_is_raw() {
        // 21-byte payload in a p2pkh-shaped script
        let mut script = vec![OP_DUP, OP_HASH160, 0x15];
        script.extend_from_slice(&[0u8; 21]);
        script.push(OP_EQUALVERIFY);
        script.push(OP_CHECKSIG);
        assert!(matches!(
            classify_output_script(&bitcoin::PARAMS, &script),
            OutputScript::Raw(_)
        ));
    }
}
