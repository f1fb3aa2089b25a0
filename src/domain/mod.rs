// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// system works with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// That keeps it testable without any backend.

/// A tokenised question/answer pair and its segments
pub mod sample;

/// Pooling strategy identifiers
pub mod pooling;

/// Error types for the head and for samples
pub mod error;

/// Abstractions the other layers implement
pub mod traits;
