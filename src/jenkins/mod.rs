//! Jenkins job model: JSON reports and polymorphic `config.xml` documents.

pub mod diagnostics;
pub mod error;
pub mod job;
pub mod scm;
pub mod steps;
pub mod types;
pub mod variant;
pub mod xml;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use error::{Error, Result};
pub use job::{
    Codec, JobDocument, MavenJob, PipelineDefinition, PipelineJob, job_from_xml, job_to_xml,
};
pub use types::{Build, BuildResult, BuildStatus, Job, Parameter, QueueItem, from_json};
pub use variant::{PostBuildStep, Registry, ScmBinding, Shape, SlotKind, TriggerBinding};
