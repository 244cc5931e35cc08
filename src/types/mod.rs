pub mod paper;

pub use paper::PaperRecord;
