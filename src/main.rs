mod cli;

use clap::Parser;
use cli::args::Cli;

fn main() {
    let cli = Cli::parse();
    pui::logging::init(false);
    std::process::exit(cli::run(cli));
}
