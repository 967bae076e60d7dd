use crate::cli::Method;
use crate::errors::Result;
use crate::naming::TaskId;
use crate::workflow::TaskWorkflow;

pub mod init;
pub mod land;
pub mod release;
pub mod review;

pub use init::InitCommand;
pub use land::LandCommand;
pub use release::ReleaseCommand;
pub use review::ReviewCommand;

/// One command line method bound to its task
pub trait Command {
    /// Run against `workflow` and return the summary shown to the operator
    fn execute(&self, workflow: &TaskWorkflow<'_>) -> Result<String>;
}

pub fn command_for(method: Method, task: TaskId) -> Box<dyn Command> {
    match method {
        Method::Init => Box::new(InitCommand::new(task)),
        Method::RequestReview => Box::new(ReviewCommand::new(task)),
        Method::Land => Box::new(LandCommand::new(task)),
        Method::ReleaseTag => Box::new(ReleaseCommand::new(task)),
    }
}
