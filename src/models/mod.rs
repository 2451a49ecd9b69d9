pub mod job;
pub mod loaders;
pub mod session;

pub use job::{Job, SubmissionPayload};
pub use loaders::{load_all_toml_files, load_toml_to_job};
pub use session::{
    AbortReason, PageContent, Session, SessionOutcome, SessionStatus, SubmitReply,
};
