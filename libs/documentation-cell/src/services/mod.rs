pub mod template;
pub mod transcript;

pub use template::NoteTemplateService;
pub use transcript::TranscriptService;
