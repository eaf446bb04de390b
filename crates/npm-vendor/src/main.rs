use tracing_subscriber::EnvFilter;
mod cli;

fn print_version() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match cli::parse_cli(&args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("npm-vendor: {e}");
            std::process::exit(2);
        }
    };

    let cli = match parsed {
        cli::Parsed::Help => {
            cli::print_help();
            return;
        }
        cli::Parsed::Version => {
            print_version();
            return;
        }
        cli::Parsed::Run(cli) => cli,
    };

    init_tracing(cli.global.quiet);
    let code = match cli::run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("npm-vendor: {e}");
            1
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
}
