pub mod batch;
pub mod resolver;
pub mod scheduler;
pub mod submitter;

pub use batch::BatchRunner;
pub use resolver::ClaimResolver;
pub use scheduler::{SchedulerHandle, SignScheduler};
pub use submitter::TxSubmitter;
