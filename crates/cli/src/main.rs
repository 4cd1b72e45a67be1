use std::process::ExitCode;

fn main() -> ExitCode {
    demandgen_cli::run()
}
