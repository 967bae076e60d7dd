use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::config::TaskflowConfig;
use crate::errors::Result;
use crate::external::{ProcessCommandExecutor, ReviewCli};
use crate::git::Git2Repository;
use crate::workflow::{PromptResolver, TaskWorkflow};

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(about = "Task branch workflow on top of git and an external review tool")]
#[command(long_about = "Taskflow keeps one integration branch per task on the remote, \
                       sends the task branch through review, lands it onto the integration \
                       branch and finally merges the integration branch into mainline with a \
                       release tag.")]
pub struct Cli {
    /// Operation to run: init, diff, land or prd
    #[arg(help = "Operation: init, diff (request-review), land, prd (release-tag)")]
    pub method: String,

    /// Task identifier, e.g. T123
    #[arg(short = 't', long, help = "Task identifier, must start with the task prefix")]
    pub task: String,

    /// Working copy to operate on
    #[arg(short = 'p', long, default_value = ".", help = "Path to the git working copy")]
    pub path: PathBuf,

    /// Log branch creation steps
    #[arg(short = 'v', long, help = "Report branch creation steps")]
    pub verbose: bool,
}

/// Operations reachable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Init,
    RequestReview,
    Land,
    ReleaseTag,
}

impl Method {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "init" => Some(Method::Init),
            "diff" | "request-review" => Some(Method::RequestReview),
            "land" => Some(Method::Land),
            "prd" | "release-tag" => Some(Method::ReleaseTag),
            _ => None,
        }
    }
}

/// What a command line invocation ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Completed(Method),
    Unsupported(String),
}

/// Resolve configuration, open the working copy and run the requested method.
pub fn run(cli: &Cli) -> Result<Dispatch> {
    TaskflowConfig::load_env_file(&cli.path)?;
    let config = TaskflowConfig::load(&cli.path)?;

    let task = config.naming.validate_task_id(&cli.task)?;
    let Some(method) = Method::parse(&cli.method) else {
        return Ok(Dispatch::Unsupported(cli.method.clone()));
    };

    let repo = Git2Repository::open(&cli.path, config.workflow.remote.clone())?;
    let review = ReviewCli::new(
        Arc::new(ProcessCommandExecutor::interactive()),
        config.review.program.clone(),
        cli.path.clone(),
    );
    let resolver = PromptResolver::stdio(config.workflow.confirm_word.clone());
    let workflow = TaskWorkflow::new(&repo, &review, &resolver, config.workflow_settings());

    let summary = commands::command_for(method, task).execute(&workflow)?;
    println!("{summary}");
    Ok(Dispatch::Completed(method))
}
