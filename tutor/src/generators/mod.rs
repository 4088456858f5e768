//! One-shot generators: image, story, speech and data analysis.
//!
//! None of these touch chat sessions. Each validates its input before any
//! request is made and surfaces a single error on failure; there are no retries.

mod analysis;
mod image;
mod media;
mod speech;
mod story;

pub use analysis::{analyze_data, check_csv_path, ANALYSIS_MODEL};
pub use image::generate_image;
pub use media::DataUri;
pub use speech::text_to_speech;
pub use story::generate_story;
