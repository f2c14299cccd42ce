use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vellum", version, about = "Vellum single-file component compiler")]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the blocks of a component file as JSON.
    Split {
        input: PathBuf,
    },
    /// Print the virtual module ids a component file exposes.
    Ids {
        input: PathBuf,
        /// JSON plugin options
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compile component files into render modules and stylesheets.
    Build {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory (default: target/vellum-gen)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Hoist static subtrees into staticRenderFns
        #[arg(long)]
        hoist_static: bool,
        /// Skip source maps
        #[arg(long)]
        no_source_map: bool,
        /// JSON plugin options
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Split { input } => println!("{}", vellum_cli::split_cmd(&input)?),
        Commands::Ids { input, config } => {
            let options = vellum_cli::load_options(config.as_deref(), false, false)?;
            for id in vellum_cli::ids_cmd(&input, &options)? {
                println!("{id}");
            }
        }
        Commands::Build {
            inputs,
            out_dir,
            hoist_static,
            no_source_map,
            config,
        } => {
            let options = vellum_cli::load_options(config.as_deref(), hoist_static, no_source_map)?;
            vellum_cli::build_cmd(&inputs, out_dir.as_deref(), &options)?;
        }
    }
    Ok(())
}
