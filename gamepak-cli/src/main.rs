#![forbid(unused_must_use)]

use clap::Parser;

mod delete;
mod dump_all;
mod extract;
mod list;

#[derive(clap::Parser)]
struct CommandWithFlags {
    /// Reduce logging to just warnings and errors.
    #[arg(long)]
    quiet: bool,

    /// Turn on debug output. Noisy!
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Loads an archive, deletes one entry, and saves it to a new file.
    Delete(delete::Options),
    /// Prints an archive's entry names, one per line.
    List(list::Options),
    /// Writes one entry's payload to a file.
    Extract(extract::Options),
    /// Extracts every entry into a directory, named by entry and format extension.
    DumpAll(dump_all::Options),
}

fn main() -> anyhow::Result<()> {
    let command_with_flags = CommandWithFlags::parse();
    configure_tracing(&command_with_flags);

    match command_with_flags.command {
        Command::Delete(args) => delete::command(&args)?,
        Command::List(args) => list::command(&args)?,
        Command::Extract(args) => extract::command(&args)?,
        Command::DumpAll(args) => dump_all::command(&args)?,
    }

    Ok(())
}

fn configure_tracing(args: &CommandWithFlags) {
    use tracing_subscriber::filter::LevelFilter;

    let max_level = if args.quiet {
        LevelFilter::WARN
    } else if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::fmt().with_max_level(max_level).init();
}
