//! Question and answer extraction from exam PDFs with a generative model.

mod config;
mod extractor;
mod generative;
mod prompt;
mod response;
mod subjects;

pub use config::{BatchRange, ExtractionConfig, ExtractionKind};
pub use extractor::{BookExtractor, ExtractionOutput};
pub use generative::{GenerativeClient, GenerativeError, VertexGenerativeClient};
pub use prompt::{batch_prompt, overview_prompt};
pub use response::clean_json_response;
pub use subjects::{DEFAULT_SUBJECT, SubjectProfile, available_subjects, subject_profile};

#[cfg(test)]
pub(crate) use extractor::tests::ScriptedModel;
