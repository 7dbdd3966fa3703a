// Engine module - grid model, search engine, and the UI layer around them
// The UI layer (input, overlay, render) only reads engine state and sends commands

pub mod config;
pub mod grid;
pub mod input;
pub mod navigation;
pub mod overlay;
pub mod render;
pub mod traversal;

// Re-export commonly used items
pub use navigation::FinalPath;
pub use traversal::TraversalEngine;
