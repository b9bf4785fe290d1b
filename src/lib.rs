pub mod config;
pub mod error;
pub mod frame_extractor;
pub mod keyframes;
pub mod matching;
pub mod motion;
pub mod pipeline;
pub mod stitcher;

#[cfg(test)]
pub(crate) mod testutil;
