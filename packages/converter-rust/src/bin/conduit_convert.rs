//! Command-line front end for the conversion engine.
//!
//! Converts a value given as text to a named builtin type, or lists the
//! registered conversions.

use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use clap::{Parser, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use conduit_converter::conduit_core::{ConversionContext, TypeConverterExt, Value};
use conduit_converter::{ConversionEngine, ConverterConfig, ExistsPolicy, LoadMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Eager,
    Lazy,
}

#[derive(Parser, Debug)]
#[command(name = "conduit-convert")]
#[command(about = "Convert a value between builtin types")]
struct Args {
    /// Target type name (e.g. `integer`, `json`, `i64`)
    #[arg(short, long, value_name = "TYPE", required_unless_present = "list")]
    to: Option<String>,

    /// Type the input text is converted to before the target
    #[arg(short, long, value_name = "TYPE", default_value = "string")]
    from: String,

    /// Loader mode
    #[arg(long, value_enum, default_value_t = Mode::Eager, env = "CONDUIT_LOAD_MODE")]
    mode: Mode,

    /// Print utilization counters after converting
    #[arg(long)]
    stats: bool,

    /// List registered conversions and exit
    #[arg(long)]
    list: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Input text
    #[arg(required_unless_present = "list")]
    value: Option<String>,
}

impl Args {
    fn config(&self) -> ConverterConfig {
        ConverterConfig {
            load_mode: match self.mode {
                Mode::Eager => LoadMode::Eager,
                Mode::Lazy => LoadMode::Lazy,
            },
            exists_policy: ExistsPolicy::Fail,
            statistics_enabled: self.stats,
            ..ConverterConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let engine = ConversionEngine::with_defaults(Arc::new(args.config()));
    engine.start()?;

    if args.list {
        for (source, target) in engine.mappings() {
            let source = source.map_or_else(|| "null".to_string(), |s| s.name().to_string());
            println!("{source} -> {target}");
        }
        return Ok(());
    }

    let rendered = convert(&engine, &args)?;
    println!("{rendered}");
    if args.stats {
        eprintln!("{}", engine.statistics());
    }
    engine.stop();
    Ok(())
}

fn convert(engine: &ConversionEngine, args: &Args) -> anyhow::Result<String> {
    let (Some(to), Some(text)) = (args.to.as_deref(), args.value.as_deref()) else {
        return Err(anyhow!("a target type and a value are required"));
    };
    let catalog = engine.catalog();
    let from = catalog
        .get(&args.from)
        .ok_or_else(|| anyhow!("unknown source type {:?}", args.from))?;
    let target = catalog
        .get(to)
        .ok_or_else(|| anyhow!("unknown target type {to:?}"))?;

    let ctx = ConversionContext::default();
    let input = engine
        .mandatory_convert(&from, &ctx, Some(&Value::of(text.to_string())))
        .with_context(|| format!("reading input as {from}"))?;
    let output = engine.mandatory_convert(&target, &ctx, Some(&input))?;
    debug!(from = %from, to = %target, result = %output.type_descriptor(), "converted");

    Ok(engine
        .try_convert_to::<String>(&ctx, &output)
        .unwrap_or_else(|| output.describe(ctx.max_logged_chars)))
}

#[cfg(test)]
mod tests {
    use conduit_converter::conduit_core::builtin;

    use super::*;

    fn engine() -> ConversionEngine {
        let engine = ConversionEngine::with_defaults(Arc::new(ConverterConfig::default()));
        engine.start().unwrap();
        engine
    }

    #[test]
    fn parses_conversion_arguments() {
        let args = Args::try_parse_from(["conduit-convert", "--to", "integer", "42"]).unwrap();
        assert_eq!(args.to.as_deref(), Some("integer"));
        assert_eq!(args.from, "string");
        assert_eq!(args.value.as_deref(), Some("42"));
        assert!(matches!(args.config().load_mode, LoadMode::Eager));
    }

    #[test]
    fn list_needs_no_value() {
        let args = Args::try_parse_from(["conduit-convert", "--list", "--mode", "lazy"]).unwrap();
        assert!(args.list);
        assert!(matches!(args.config().load_mode, LoadMode::Lazy));
        assert!(Args::try_parse_from(["conduit-convert"]).is_err());
    }

    #[test]
    fn converts_through_an_intermediate_type() {
        let engine = engine();
        let args =
            Args::try_parse_from(["conduit-convert", "--from", "json", "--to", "long", "12"]).unwrap();
        assert_eq!(convert(&engine, &args).unwrap(), "12");
        assert_eq!(builtin::long().name(), "long");
    }

    #[test]
    fn unknown_type_names_are_errors() {
        let engine = engine();
        let args = Args::try_parse_from(["conduit-convert", "--to", "money", "1"]).unwrap();
        assert!(convert(&engine, &args).unwrap_err().to_string().contains("money"));
    }
}
