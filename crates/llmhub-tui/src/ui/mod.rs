//! Terminal UI module using ratatui.
//!
//! - `render`: Frame rendering, layout and overlays
//! - `input`: Keyboard handling and mouse-to-activity mapping
//! - `styles`: Color palette and text styling

pub mod input;
pub mod render;
pub mod styles;
