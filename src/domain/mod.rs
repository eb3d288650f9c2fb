// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the task, with no Burn types,
// no file I/O and no model code.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A tokenised question/option pair with its binary label
pub mod qa_pair;

// Abstractions other layers implement
pub mod traits;
