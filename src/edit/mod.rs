//! Reversible edits, undo history and the editor session.

/// Change records and the target they apply to.
pub mod change;
/// Editor session over one animation.
pub mod context;
/// Undo/redo stack.
pub mod history;
