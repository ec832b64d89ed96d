//! Subject-tracked video reframing.
//!
//! Converts source video to a target aspect ratio while keeping a detected
//! subject centered: detect → track → smooth → pan-cap → crop → resize → write.

pub mod detection;
pub mod framing;
pub mod pipeline;
pub mod shared;
pub mod video;
