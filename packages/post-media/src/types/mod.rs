//! Data types shared by every stage of extraction.

pub mod config;
pub mod media;
pub mod result;
pub mod source;
