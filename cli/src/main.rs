mod commands;
mod sink;
mod terminal;

use commands::{CommandLine, Commands, info, run};
use qualisys_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands: CommandLine = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet);

    let cfg: Config = Config {
        json_frames: commands.json,
        quiet: commands.quiet,
    };

    match commands.command {
        Commands::Info => {
            print::header("registered extensions", cfg.quiet);
            info::info()
        }
        Commands::Run {
            config,
            connection,
        } => {
            print::header("starting extensions", cfg.quiet);
            run::run(config.as_deref(), connection, &cfg).await
        }
    }
}
