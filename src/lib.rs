pub mod classifier;
pub mod colors;
pub mod config;
pub mod error;
pub mod labeler;
pub mod locator;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod splitter;
pub mod writer;

pub use classifier::{classify, classify_text, Classification};
pub use colors::{color_tag, extract_colors, ramp_tag, ColorFragment, ColorKind};
pub use config::ExtractConfig;
pub use error::StyleError;
pub use model::{LayerBlob, RendererKind, StyleClass, StyleItem, StyleItemRecord};
pub use normalizer::normalize;
pub use pipeline::{extract_blob, RunContext, RunSummary, StylePipeline};
pub use splitter::{split, SplitMode};
pub use writer::{is_style_file, JsonLinesWriter, StyleSink, StylxWriter};
