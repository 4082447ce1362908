use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use viewdoo::logging::Logger;

mod logging;
mod render;
mod watch;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true, help = "Log compiles and renders")]
    verbose: bool,

    #[command(subcommand)]
    subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Compile view definitions and report errors.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Render a view and print its stylesheet and markup.
    Render {
        file: PathBuf,

        #[arg(long, help = "Props as a JSON object")]
        props: Option<String>,
    },

    /// Render a view every time it changes.
    Watch {
        file: PathBuf,

        #[arg(long, help = "Props as a JSON object")]
        props: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    Logger::init_with(if args.verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    });

    let result = match args.subcommands {
        Subcommands::Check { files } => {
            let failed = files.iter().filter(|file| !render::check(file)).count();
            if failed > 0 {
                exit(1);
            }
            Ok(())
        }

        Subcommands::Render { file, props } => render::props(props.as_deref())
            .and_then(|props| render::render(&file, &props)),

        Subcommands::Watch { file, props } => match render::props(props.as_deref()) {
            Ok(props) => watch::watch(file, props).await,
            Err(err) => Err(err),
        },
    };

    if let Err(err) = result {
        match err {
            viewdoo::Error::View(viewdoo::view::template::Error::Pretty(report)) => {
                eprintln!("{}", report)
            }
            err => logging::error(err),
        }
        exit(1);
    }
}
