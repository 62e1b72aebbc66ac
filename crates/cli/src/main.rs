use std::process::ExitCode;

fn main() -> ExitCode {
    movequote_cli::run()
}
