// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal.
//
// Rules for this layer:
//   - No tensor maths or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination

// Load → split → train → checkpoint
pub mod train_use_case;

// Load checkpoint → score pairs → CSV
pub mod score_use_case;
