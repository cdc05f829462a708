use std::process::ExitCode;

fn main() -> ExitCode {
    match jamcam_eval::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
