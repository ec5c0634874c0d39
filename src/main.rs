fn main() {
    use bookcrawl::logging::{self, Verbosity};
    use clap::Parser;
    use std::error::Error;

    let args = bookcrawl::cli::Args::parse();
    let verbosity = if args.verbose {
        Verbosity::Verbose
    } else if args.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    if let Err(e) = logging::init(verbosity) {
        eprintln!("Warning: {:#}", e);
    }

    if let Err(e) = bookcrawl::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
