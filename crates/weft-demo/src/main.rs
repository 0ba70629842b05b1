//! Base64 encoder and decoder built on weft.
//!
//! `weft-demo encode <text>` prints the Base64 form of the text's UTF-8
//! bytes; `weft-demo decode <text>` reverses it. The global `--verbose`
//! option announces each command on standard error before it runs.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context as _;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use tracing::{debug, error};
use weft::{
    CommandDecl, Console, Descriptor, InvocationContext, OptionCell, OptionField, OptionSet,
    Param, Program,
};
use weft_config::TelemetryConfig;

static VERBOSE: OptionCell<bool> = OptionCell::new(false);

#[expect(
    clippy::needless_pass_by_value,
    reason = "handler parameters are owned values bound from the command line"
)]
fn encode(input: String, url_safe: bool, console: Console) -> anyhow::Result<()> {
    let engine = if url_safe { &URL_SAFE } else { &STANDARD };
    let encoded = engine.encode(input);
    writeln!(console.out(), "{encoded}").context("failed to write encoded text")?;
    Ok(())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "handler parameters are owned values bound from the command line"
)]
fn decode(input: String, url_safe: bool, console: Console) -> anyhow::Result<()> {
    let engine = if url_safe { &URL_SAFE } else { &STANDARD };
    let decoded = engine
        .decode(input.trim())
        .with_context(|| format!("'{input}' is not valid Base64"))?;
    let mut out = console.out();
    out.write_all(&decoded)
        .and_then(|()| out.write_all(b"\n"))
        .context("failed to write decoded bytes")?;
    Ok(())
}

fn program() -> Program {
    Program::new("weft-demo")
        .version(env!("CARGO_PKG_VERSION"))
        .describe("Encode and decode Base64 text")
        .options(
            OptionSet::new("Globals").field(
                OptionField::new("Verbose", &VERBOSE).with(
                    Descriptor::option()
                        .alias("v")
                        .describe("Announce each command before it runs"),
                ),
            ),
        )
        .command(
            CommandDecl::new("Encode", encode)
                .descriptor(Descriptor::command().describe("Encode text as Base64"))
                .param(Param::argument("Input").describe("Text to encode"))
                .param(url_safe_param()),
        )
        .command(
            CommandDecl::new("Decode", decode)
                .descriptor(Descriptor::command().describe("Decode Base64 into text"))
                .param(Param::argument("Input").describe("Base64 to decode"))
                .param(url_safe_param()),
        )
}

fn url_safe_param() -> Param {
    Param::option("UrlSafe")
        .alias("u")
        .describe("Use the URL-safe alphabet")
        .default_value(false)
}

fn announce(context: &InvocationContext) -> anyhow::Result<()> {
    debug!(command = %context.command_path(), "dispatching");
    if VERBOSE.get() {
        writeln!(context.console().err(), "running {}", context.command_path())?;
    }
    Ok(())
}

fn report(failure: &weft::DispatchError, context: &InvocationContext) -> anyhow::Result<i32> {
    writeln!(context.console().err(), "error: {failure}")?;
    Ok(1)
}

fn main() -> ExitCode {
    let telemetry = TelemetryConfig::from_env()
        .map_err(anyhow::Error::from)
        .and_then(|config| weft::telemetry::initialise(&config).map_err(anyhow::Error::from));
    if let Err(failure) = telemetry {
        return fail(&failure);
    }

    match weft::install(program()) {
        Ok(app) => {
            app.on_before_command(announce);
            app.set_exception_handler(report);
            app.run_process()
        }
        Err(failure) => fail(&anyhow::Error::from(failure)),
    }
}

fn fail(failure: &anyhow::Error) -> ExitCode {
    error!(error = %failure, "weft-demo failed to start");
    if let Err(write_error) = writeln!(io::stderr(), "weft-demo: {failure:#}") {
        error!(error = %write_error, "failed to report startup error");
    }
    ExitCode::FAILURE
}
