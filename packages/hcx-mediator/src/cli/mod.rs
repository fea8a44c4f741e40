use crate::config::{LogConfig, LogFormat, LogLevel};
use clap::Parser;

const DEFAULT_CONFIG_FILE: &str = "hcx-mediator.toml";

#[derive(Clone, Debug, Parser)]
#[command(version, about, verbatim_doc_comment)]
///
/// HCX Mediator
///
/// Exchanges encrypted FHIR bundles with the national health-claims gateway:
/// eligibility checks, claim submissions and payor communications out,
/// asynchronous callbacks in.
///
pub struct Args {
    /// Optional path to an HCX Mediator configuration file.
    ///
    /// Default is "hcx-mediator.toml".
    /// Configuration is loaded from this file, if present.
    /// Environment variables are used instead of the file or to override any values defined in the file.
    #[arg(short = 'p', long, default_value = DEFAULT_CONFIG_FILE, verbatim_doc_comment, global = true)]
    pub config_file_path: String,

    ///
    /// Optional log level.
    ///
    #[arg(short, long, value_enum, default_value_t = LogConfig::default_log_level(), env = "HCX_LOG__LEVEL", global = true)]
    pub log_level: LogLevel,

    ///
    /// Optional log format. Default level is "pretty" if running in a terminal session, otherwise "structured".
    ///
    #[arg(short='f', long, value_enum, default_value_t = LogConfig::default_log_format(), env = "HCX_LOG__FORMAT", global = true)]
    pub log_format: LogFormat,
}
