// src/routing/mod.rs
// The classification-and-parameter-extraction pipeline:
// message -> classifier -> (label, confidence, reasoning)
//         -> extractor (for param-bearing labels) -> params
//         -> dispatcher -> action handler -> uniform envelope.

pub mod classifier;
pub mod dispatcher;
pub mod extractor;

pub use classifier::{ClassificationResult, IntentClassifier, Label};
pub use dispatcher::{dispatch, ActionError, ActionRequest, ActionResponse};
pub use extractor::{ExtractedParams, ParamExtractor, RepoDefaults, RepositoryRef};
