use std::process::ExitCode;

use callsite_log::{log, CompLogger, LogLevel, Logger, LoggerArgs, LoggerConfig};
use clap::Parser;

#[derive(Parser)]
#[command(about = "Logs a few records to show the caller locations and field order")]
struct Cli {
    /// Optional TOML file with logger settings; flags override it
    #[arg(long)]
    config: Option<String>,

    #[command(flatten)]
    log: LoggerArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let root = Logger::new();
    if let Err(err) = root.add_caller_src_path_prefix(1) {
        root.warn("cannot register source root").attr("error", err.to_string());
    }
    let main_log = root.comp("main");

    let cfg = match &cli.config {
        Some(path) => LoggerConfig::from_file(path),
        None => Ok(LoggerConfig::default()),
    };
    let cfg = cfg.map(|mut cfg| {
        cli.log.apply_to(&mut cfg);
        cfg
    });
    if let Err(err) = cfg.and_then(|cfg| root.apply_config(&cfg)) {
        main_log.error("cannot configure logger").attr("error", err.to_string());
        return ExitCode::FAILURE;
    }

    main_log.error("Error");
    main_log.warn("Warn");
    main_log.info("Info");
    main_log.debug("Debug");
    main_log.trace("Trace");

    let comp = root.comp("comp");
    func1(&comp);
    func2(&comp.with_field("extra_info", "text"));

    ExitCode::SUCCESS
}

fn func1(log: &CompLogger) {
    log!(log, LogLevel::Error, "Error");
    log!(log, LogLevel::Warn, "Warn").attr("attempt", 2);
    log!(log, LogLevel::Info, "Info");
    log!(log, LogLevel::Debug, "Debug");
}

fn func2(log: &CompLogger) {
    if log.enabled(LogLevel::Debug) {
        log.debug(format!("{} prefixes registered", log.logger().resolver().prefixes().len()));
    }
    log.info("Info").attr("hello", "world").attr("this is", 132);
    log.warn("Warn");
}
