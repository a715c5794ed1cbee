pub mod classifier;

pub use classifier::{classify, PatternClassifier};
