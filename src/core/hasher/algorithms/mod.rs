//! Fingerprint algorithm implementations.

mod perceptual;

pub use perceptual::PerceptualHasher;
