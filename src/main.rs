use clap::Parser;
use supass::cli::Cli;

fn main() {
    let cli = Cli::parse();
    supass::cli::init_tracing(&cli.log_level);

    if let Err(e) = supass::cli::resolve::execute(&cli) {
        supass::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
