use std::process::ExitCode;

fn main() -> ExitCode {
    printquote_cli::run()
}
