//! Outline recoloring for sprite-sheet tile images.
//!
//! Outline pixels of a marker color are replaced by a blend of their
//! neighborhood, and the same blend is mirrored onto the nation-color
//! overlays that share the base image's pixel grid.

pub mod cli;
pub mod io;
pub mod logger;
pub mod ops;
pub mod settings;
