//! Utility modules shared across tvlink

pub mod url;
