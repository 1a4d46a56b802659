mod cli;

use configor::{Config, Configor};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CONFIGOR_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let configor = session(&cli.session);

    let command_result = match cli.command {
        cli::Command::Env => env(&configor),
        cli::Command::Files(files_cli) => files(&configor, files_cli),
        cli::Command::Merge(merge_cli) => merge(&configor, merge_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn session(args: &cli::SessionArgs) -> Configor {
    Configor::new(Config {
        environment: args.environment.clone(),
        env_prefix: args.prefix.clone(),
        debug: args.debug,
        verbose: args.verbose,
        error_on_unmatched_keys: false,
    })
}

fn env(configor: &Configor) -> anyhow::Result<()> {
    println!("environment: {}", configor.environment());
    match configor.global_prefix() {
        Some(prefix) => println!("prefix: {prefix}"),
        None => println!("prefix: (none)"),
    }
    Ok(())
}

fn files(configor: &Configor, cli: cli::FilesCommand) -> anyhow::Result<()> {
    let files = configor.configuration_files(&cli.files);
    anyhow::ensure!(!files.is_empty(), "No files found");

    for file in files {
        println!("{}\t{}", file.origin, file.path.display());
    }
    Ok(())
}

fn merge(configor: &Configor, cli: cli::MergeCommand) -> anyhow::Result<()> {
    let value = configor.merge(&cli.files)?;

    match cli.output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &value)?,
    };

    Ok(())
}
