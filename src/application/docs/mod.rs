//! Documentation generation: section selection, GenAI calls, rendering and scoring.

mod format;
mod generator;
mod quality;
mod sections;

pub use format::{DocumentFormatter, render_markdown};
pub use generator::{
    DocumentationGenerator, GeneratedSection, GenerationFailure, GenerationSettings,
    SECTION_CONCURRENCY,
};
pub use quality::score_documentation;
pub use sections::{DocSection, PromptContext, build_prompt, select_sections};
