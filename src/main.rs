use std::io;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let (mut stdout, mut stderr) = (io::stdout().lock(), io::stderr());
    let code = fiatconv::run(std::env::args_os(), &mut stdout, &mut stderr).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
