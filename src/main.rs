use anyhow::Result;
use clap::Parser;
use deepctx::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = cli.context();
    deepctx::infra::logging::init_tracing(&ctx);

    match cli.command {
        Commands::Pack(args) => deepctx::pack_run(args, &ctx),
        Commands::Tree(args) => deepctx::tree_run(args, &ctx),
        Commands::Init(args) => deepctx::infra::config::init(args, &ctx),
        Commands::Completions(args) => deepctx::completion::run(args, &ctx),
    }
}
