//! Common imports for the binary's command modules.

pub use color_eyre::eyre::Result;
