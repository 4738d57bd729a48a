//! Flat-file header storage and chain verification
//!
//! Each chain persists to one append-style file of fixed-size records,
//! so the byte offset of a header is its height times the record size.
//! Verification is all-or-nothing per chunk: nothing is written until
//! every header in the chunk has passed linkage and proof-of-work.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::difficulty::RetargetContext;
use crate::error::{ChainError, Result};
use crate::hashes::hash_to_uint;
use crate::headers;
use crate::params::{ChainParams, ChainSpec};
use crate::types::{BlockHeader, Hash32};

/// Per-chain header files under one directory
pub struct HeaderStore {
    dir: PathBuf,
}

impl HeaderStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        HeaderStore { dir: dir.into() }
    }

    /// File holding one chain's headers
    pub fn chain_path(&self, params: &ChainParams) -> PathBuf {
        self.dir
            .join(format!("{}_headers", params.code.to_lowercase()))
    }

    /// Header at a height, or `None` when the file ends before it
    pub fn read_header(&self, chain: &dyn ChainSpec, height: u64) -> Result<Option<BlockHeader>> {
        let params = chain.params();
        let mut file = match File::open(self.chain_path(params)) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.seek(SeekFrom::Start(height * params.header_size as u64))?;
        let mut raw = vec![0u8; params.header_size];
        if let Err(e) = file.read_exact(&mut raw) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e.into());
        }
        let mut header = chain.header_from_bytes(&raw)?;
        header.height = Some(height);
        Ok(Some(header))
    }

    /// Write one header at its height
    pub fn save_header(&self, chain: &dyn ChainSpec, header: &BlockHeader) -> Result<()> {
        let height = header
            .height
            .ok_or_else(|| ChainError::Storage("Cannot save a header without a height".to_string()))?;
        let bytes = chain.header_to_bytes(header)?;
        self.write_at(chain.params(), height, &bytes)
    }

    /// Write consecutive headers starting at `start_height`
    pub fn save_chunk(
        &self,
        chain: &dyn ChainSpec,
        start_height: u64,
        headers: &[BlockHeader],
    ) -> Result<()> {
        let params = chain.params();
        let mut data = Vec::with_capacity(headers.len() * params.header_size);
        for header in headers {
            data.extend_from_slice(&chain.header_to_bytes(header)?);
        }
        self.write_at(params, start_height, &data)
    }

    /// Height of the last stored header, `None` for an empty store
    pub fn local_height(&self, chain: &dyn ChainSpec) -> Result<Option<u64>> {
        let params = chain.params();
        let len = match fs::metadata(self.chain_path(params)) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok((len / params.header_size as u64).checked_sub(1))
    }

    /// Drop the most recent headers after a reorg signal
    ///
    /// Removes `coinbase_maturity + 1` headers from the tip so the next
    /// sync re-fetches the contested region. Returns the new local
    /// height; an empty or missing file is left alone.
    pub fn truncate_on_reorg(&self, chain: &dyn ChainSpec) -> Result<Option<u64>> {
        let params = chain.params();
        let tip = match self.local_height(chain)? {
            Some(h) => h,
            None => return Ok(None),
        };
        let keep = tip.saturating_sub(params.coinbase_maturity);
        let file = OpenOptions::new()
            .write(true)
            .open(self.chain_path(params))?;
        file.set_len(keep * params.header_size as u64)?;
        log::info!("{}: reorg truncation kept {} headers", params.code, keep);
        Ok(keep.checked_sub(1))
    }

    /// Verify a serialized chunk and persist it if every header passes
    ///
    /// The chunk index fixes the height of its first record. The
    /// predecessor of a non-first chunk must already be stored.
    pub fn verify_chunk(&self, chain: &dyn ChainSpec, index: u64, data: &[u8]) -> Result<()> {
        let params = chain.params();
        let record = params.header_size;
        if data.len() % record != 0 {
            return Err(ChainError::Serialization(format!(
                "Chunk length {} is not a multiple of {}",
                data.len(),
                record
            )));
        }
        let start_height = index * params.chunk_size;
        let mut prev_hash = if index == 0 {
            [0u8; 32]
        } else {
            let prev = self.read_header(chain, start_height - 1)?.ok_or_else(|| {
                ChainError::StorageAbsent(format!(
                    "No stored header below chunk {} of {}",
                    index, params.code
                ))
            })?;
            chain.hash_header(&prev)?
        };

        let mut verified: Vec<BlockHeader> = Vec::with_capacity(data.len() / record);
        for (i, raw) in data.chunks(record).enumerate() {
            let mut header = chain.header_from_bytes(raw)?;
            header.height = Some(start_height + i as u64);
            self.check_header(chain, &header, raw, &prev_hash, &verified)?;
            prev_hash = chain.hash_header(&header)?;
            verified.push(header);
        }
        if verified.is_empty() {
            return Ok(());
        }
        self.save_chunk(chain, start_height, &verified)?;
        log::debug!(
            "{}: verified chunk {} ({} headers)",
            params.code,
            index,
            verified.len()
        );
        Ok(())
    }

    /// Check already-parsed candidate headers against the stored chain
    ///
    /// The candidates must carry consecutive heights; the first one may
    /// attach anywhere the store already reaches. Diagnostics go to the
    /// log, the caller only learns accept or reject.
    pub fn verify_contiguous_headers(
        &self,
        chain: &dyn ChainSpec,
        candidates: &[BlockHeader],
    ) -> bool {
        match self.check_contiguous(chain, candidates) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "{}: rejecting candidate headers: {}",
                    chain.params().code,
                    e
                );
                false
            }
        }
    }

    fn check_contiguous(&self, chain: &dyn ChainSpec, candidates: &[BlockHeader]) -> Result<()> {
        for (i, header) in candidates.iter().enumerate() {
            let height = header
                .height
                .ok_or_else(|| ChainError::Storage("Candidate header carries no height".to_string()))?;
            let prev_hash = if i == 0 {
                if height == 0 {
                    [0u8; 32]
                } else {
                    let prev = self.read_header(chain, height - 1)?.ok_or_else(|| {
                        ChainError::StorageAbsent(format!(
                            "No stored header at height {}",
                            height - 1
                        ))
                    })?;
                    chain.hash_header(&prev)?
                }
            } else {
                if candidates[i - 1].height.map(|h| h + 1) != Some(height) {
                    return Err(ChainError::ConsensusViolation(format!(
                        "Candidate heights jump at {}",
                        height
                    )));
                }
                chain.hash_header(&candidates[i - 1])?
            };
            let raw = chain.header_to_bytes(header)?;
            self.check_header(chain, header, &raw, &prev_hash, &candidates[..i])?;
        }
        Ok(())
    }

    /// Consensus checks for one header against its predecessor hash
    ///
    /// The difficulty lookup runs before the linkage comparison so a
    /// missing retarget ancestor surfaces as `StorageAbsent` rather
    /// than a spurious linkage failure.
    fn check_header(
        &self,
        chain: &dyn ChainSpec,
        header: &BlockHeader,
        raw: &[u8],
        prev_hash: &Hash32,
        earlier: &[BlockHeader],
    ) -> Result<()> {
        let params = chain.params();
        let height = header
            .height
            .ok_or_else(|| ChainError::Storage("Header carries no height".to_string()))?;
        let expected = match params.pow {
            Some(_) => {
                let ctx = RetargetContext::new(chain, Some(self), earlier);
                Some(chain.difficulty_target(height, &ctx)?)
            }
            None => None,
        };
        if *prev_hash != header.prev_block_hash {
            return Err(ChainError::ConsensusViolation(format!(
                "Header {} of {} does not link to its predecessor",
                height, params.code
            )));
        }
        if let (Some(pow), Some((bits, target))) = (params.pow, expected) {
            if header.bits != bits {
                return Err(ChainError::ConsensusViolation(format!(
                    "Header {} of {} carries bits {:#x}, expected {:#x}",
                    height, params.code, header.bits, bits
                )));
            }
            let pow_hash = headers::algorithm_hash(pow.hash, raw)?;
            if hash_to_uint(&pow_hash) >= target {
                return Err(ChainError::ConsensusViolation(format!(
                    "Header {} of {} does not meet its target",
                    height, params.code
                )));
            }
        }
        Ok(())
    }

    fn write_at(&self, params: &ChainParams, height: u64, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(self.chain_path(params))?;
        file.seek(SeekFrom::Start(height * params.header_size as u64))?;
        file.write_all(bytes)?;
        Ok(())
    }
}
