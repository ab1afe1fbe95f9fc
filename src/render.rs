//! External Collaborator Contracts
//!
//! The core drives a page renderer, a symbol encoder, and a document
//! number allocator through these seams. Shipped implementations are
//! deterministic placeholders; deployments plug in the real ones.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::layout::DrawInstruction;
use crate::variants::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    /// Width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.0, 842.0),
            Self::Letter => (612.0, 792.0),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Page rendering failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Symbol encoding failed: {0}")]
    Failed(String),
}

/// Turns an instruction sequence into an opaque page artifact.
pub trait PageRenderer: Send + Sync {
    fn render(
        &self,
        instructions: &[DrawInstruction],
        page: PageSize,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Turns a verification payload string into a scannable raster image. The
/// core never interprets the image; it only constructs the payload.
pub trait SymbolEncoder: Send + Sync {
    fn encode(&self, payload: &str, pixels: u32) -> Result<Vec<u8>, EncodeError>;
}

/// Supplies fresh document numbers ahead of synthesis. Allocation is a
/// separate service concern; the core never generates random numbers.
pub trait NumberAllocator: Send + Sync {
    fn allocate(&self, document_type: DocumentType) -> String;
}

/// Placeholder renderer: serializes the instruction list and page size to
/// JSON bytes. A production deployment substitutes a PDF backend.
pub struct InstructionListRenderer;

impl PageRenderer for InstructionListRenderer {
    fn render(
        &self,
        instructions: &[DrawInstruction],
        page: PageSize,
    ) -> Result<Vec<u8>, RenderError> {
        let artifact = serde_json::json!({
            "page": page,
            "instructions": instructions,
        });
        serde_json::to_vec(&artifact).map_err(|e| RenderError::Failed(e.to_string()))
    }
}

/// Placeholder symbol encoder: returns a minimal valid 1x1 PNG regardless
/// of payload. Real deployments substitute a QR backend.
pub struct PlaceholderSymbolEncoder;

impl SymbolEncoder for PlaceholderSymbolEncoder {
    fn encode(&self, payload: &str, _pixels: u32) -> Result<Vec<u8>, EncodeError> {
        if payload.is_empty() {
            return Err(EncodeError::Failed("empty payload".to_string()));
        }
        // Minimal 1x1 transparent PNG
        Ok(vec![
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A,
            0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
            0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
            0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41,
            0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
            0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
            0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
            0x42, 0x60, 0x82,
        ])
    }
}

/// Deterministic allocator: per-type prefix, fixed year, monotonically
/// increasing sequence. `PR/2025/00001`, `GWV/2025/00002`, ...
pub struct SequentialNumberAllocator {
    year: i32,
    counter: AtomicU64,
}

impl SequentialNumberAllocator {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            counter: AtomicU64::new(0),
        }
    }
}

impl NumberAllocator for SequentialNumberAllocator {
    fn allocate(&self, document_type: DocumentType) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}/{}/{:05}", document_type.number_prefix(), self.year, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_allocator_never_repeats() {
        let allocator = SequentialNumberAllocator::new(2025);
        let a = allocator.allocate(DocumentType::PermanentResidence);
        let b = allocator.allocate(DocumentType::PermanentResidence);
        assert_eq!(a, "PR/2025/00001");
        assert_eq!(b, "PR/2025/00002");
    }

    #[test]
    fn placeholder_encoder_emits_png_magic() {
        let symbol = PlaceholderSymbolEncoder
            .encode("https://verify.gov.example/verify?ref=X", 300)
            .unwrap();
        assert_eq!(&symbol[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn placeholder_encoder_rejects_empty_payload() {
        assert!(PlaceholderSymbolEncoder.encode("", 300).is_err());
    }

    #[test]
    fn instruction_renderer_embeds_page_size() {
        let bytes = InstructionListRenderer.render(&[], PageSize::A4).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["page"], "a4");
    }
}
