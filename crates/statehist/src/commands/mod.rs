//! Command dispatch.

pub mod backend;
pub mod query;

use statehist_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Query(args) => query::handle(&args, config, global).await,
        Command::Backend(args) => backend::handle(&args, config, global).await,
    }
}
