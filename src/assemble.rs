//! Chunked-upload reassembly.
//!
//! Large uploads arrive as indexed byte ranges; the codec only ever
//! sees one contiguous buffer. The assembler accepts chunks in any
//! order, tolerates retransmits (a duplicate index overwrites), and
//! refuses to produce a buffer until every index is present.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("chunk index {index} out of range for {total} chunks")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("{missing} of {total} chunks still missing")]
    Incomplete { missing: usize, total: usize },

    #[error("assembled size {actual} does not match declared size {declared}")]
    SizeMismatch { declared: usize, actual: usize },
}

pub struct ChunkAssembler {
    chunks: Vec<Option<Vec<u8>>>,
    declared_size: Option<usize>,
}

impl ChunkAssembler {
    pub fn new(total_chunks: usize) -> Self {
        Self {
            chunks: vec![None; total_chunks],
            declared_size: None,
        }
    }

    /// Declare the expected total byte size up front; `assemble` will
    /// verify the reassembled buffer against it.
    pub fn with_declared_size(total_chunks: usize, declared_size: usize) -> Self {
        Self {
            chunks: vec![None; total_chunks],
            declared_size: Some(declared_size),
        }
    }

    pub fn put(&mut self, index: usize, bytes: Vec<u8>) -> Result<(), AssembleError> {
        let total = self.chunks.len();
        let slot = self
            .chunks
            .get_mut(index)
            .ok_or(AssembleError::IndexOutOfRange { index, total })?;
        debug!(index, total, len = bytes.len(), "received chunk");
        *slot = Some(bytes);
        Ok(())
    }

    pub fn received(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(|c| c.is_some())
    }

    /// Concatenate all chunks in index order into one contiguous buffer.
    pub fn assemble(self) -> Result<Vec<u8>, AssembleError> {
        let total = self.chunks.len();
        let missing = self.chunks.iter().filter(|c| c.is_none()).count();
        if missing > 0 {
            return Err(AssembleError::Incomplete { missing, total });
        }
        let mut out = Vec::new();
        for chunk in self.chunks.into_iter().flatten() {
            out.extend_from_slice(&chunk);
        }
        if let Some(declared) = self.declared_size {
            if out.len() != declared {
                return Err(AssembleError::SizeMismatch {
                    declared,
                    actual: out.len(),
                });
            }
        }
        Ok(out)
    }
}
