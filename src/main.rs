mod cmd;

use clap::Parser;
use cmd::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("Error: {e:#}");
        if let Some(devdb::Error::DumpNotFound(_)) = e.downcast_ref::<devdb::Error>() {
            eprintln!("Hint: Run 'generate' first to create a dump");
            std::process::exit(2);
        }
        std::process::exit(1);
    }
}
