use std::process::ExitCode;

pub type CliResult<T> = anyhow::Result<T>;

/// Exit status for failures reported by the hostbridge library itself
const PROTOCOL_FAILURE: u8 = 2;

/// Convert a CliResult to an ExitCode, printing the error chain to stderr
pub fn to_exit_code(result: CliResult<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::from(failure_status(&e))
        }
    }
}

fn failure_status(error: &anyhow::Error) -> u8 {
    let protocol = error
        .chain()
        .any(|cause| cause.downcast_ref::<hostbridge::Error>().is_some());
    if protocol { PROTOCOL_FAILURE } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_protocol_errors_get_their_own_status() {
        let err = Err::<(), _>(hostbridge::Error::UnsupportedVariant("future".into()))
            .context("failed to decode payload.bin")
            .unwrap_err();
        assert_eq!(failure_status(&err), PROTOCOL_FAILURE);
    }

    #[test]
    fn test_other_errors_fail_with_one() {
        let err = anyhow::anyhow!("--deny and --no-reply are mutually exclusive");
        assert_eq!(failure_status(&err), 1);
    }
}
