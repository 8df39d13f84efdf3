pub mod analysis;
pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod scoring;

pub use analysis::{AnalysisResult, Classification, Layer, LayerExplanation, LayerScores};
pub use client::ApiClient;
pub use config::Config;
pub use error::AnalysisError;
pub use report::{render_json, render_report, report_filename};
pub use scoring::{classify, recommended_actions, Verdict};
