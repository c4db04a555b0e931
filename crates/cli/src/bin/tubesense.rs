//! TubeSense CLI binary entrypoint.

fn main() {
    if let Err(err) = tubesense_cli::app::run() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
