use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "snapline",
    about = "Snapline feed engine: avatar fan-out, live feeds, and like counters",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the effective configuration, or write a default one
    Config(ConfigArgs),
    /// Run the profile-screen scenario against in-memory stores
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration file to read
    #[arg(short, long, conflicts_with = "init")]
    pub file: Option<PathBuf>,
    /// Write the default configuration to this path
    #[arg(long, value_name = "FILE")]
    pub init: Option<PathBuf>,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Configuration file to use instead of the defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Number of posts to publish for the demo user
    #[arg(long, default_value = "3")]
    pub posts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_demo_options() {
        let cli = Cli::try_parse_from(["snapline", "-v", "demo", "--posts", "5"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Demo(args) => {
                assert_eq!(args.posts, 5);
                assert!(args.config.is_none());
            }
            Command::Config(_) => panic!("expected demo"),
        }
    }

    #[test]
    fn config_file_and_init_conflict() {
        assert!(Cli::try_parse_from(["snapline", "config", "--file", "a", "--init", "b"]).is_err());
    }
}
