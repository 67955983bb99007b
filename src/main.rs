use autocompiler::{config::Cli, run};
use clap::Parser;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(summary) => {
            if !summary.all_passed() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
