use clap::Parser;
use colored::Colorize;
use microbranch_core::cli::{self, Cli};
use microbranch_core::exit::MicrobranchExit;

fn main() -> MicrobranchExit {
    let cli = Cli::parse();

    let result = if let Some(cmd) = cli.command {
        cli::dispatch::execute(cmd)
    } else {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        Ok(MicrobranchExit::Success)
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            MicrobranchExit::for_error(&e)
        }
    }
}
