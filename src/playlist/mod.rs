//! Playlist output

pub mod generator;

pub use generator::{generate_m3u_content, save_m3u_file};
