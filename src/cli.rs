//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::chart_svg::SvgChartWriter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_series_writer::CsvSeriesWriter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::calendar::{Jurisdiction, TradingCalendar};
use crate::domain::config_validation::{
    instrument_section, parse_holidays, validate_instrument_config, validate_run_config,
};
use crate::domain::error::BackadjustError;
use crate::domain::instrument::InstrumentConfig;
use crate::domain::month_code::parse_month_codes;
use crate::domain::pipeline::{run_instrument, select_contracts};
use crate::domain::repository::ContractRepository;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::series_port::SeriesPort;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_OUTPUT_DIR: &str = ".";
const INSTRUMENT_PREFIX: &str = "instrument.";

#[derive(Parser, Debug)]
#[command(
    name = "backadjust",
    about = "Build Panama back-adjusted continuous futures series"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build continuous series for every instrument (or one)
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Trade the second-nearest contract instead of the front month
        #[arg(long)]
        backmonth: Option<bool>,
        /// Also write SVG charts
        #[arg(long)]
        plot: bool,
        /// Evaluate as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// List active rollable contracts and the trading contract
    Contracts {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        backmonth: Option<bool>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            symbol,
            backmonth,
            plot,
            as_of,
        } => run_build(&config, symbol.as_deref(), backmonth, plot, as_of),
        Command::Contracts {
            config,
            symbol,
            backmonth,
            as_of,
        } => run_contracts(&config, &symbol, backmonth, as_of),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: BackadjustError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn build_calendar(config: &dyn ConfigPort) -> Result<TradingCalendar, BackadjustError> {
    let jurisdiction = match config.get_string("calendar", "country") {
        Some(country) => {
            country
                .parse::<Jurisdiction>()
                .map_err(|reason| BackadjustError::ConfigInvalid {
                    section: "calendar".into(),
                    key: "country".into(),
                    reason,
                })?
        }
        None => Jurisdiction::default(),
    };
    let holidays = parse_holidays(config.get_string("calendar", "holidays").as_deref())?;
    Ok(TradingCalendar::new(jurisdiction).with_holidays(holidays))
}

/// The evaluation date: CLI override, then `[run] as_of`, then the local date.
pub fn resolve_today(
    config: &dyn ConfigPort,
    as_of_override: Option<NaiveDate>,
) -> Result<NaiveDate, BackadjustError> {
    if let Some(date) = as_of_override {
        return Ok(date);
    }
    match config.get_string("run", "as_of") {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            BackadjustError::ConfigInvalid {
                section: "run".into(),
                key: "as_of".into(),
                reason: "invalid as_of format, expected YYYY-MM-DD".into(),
            }
        }),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Roll settings of `symbol`: its `[instrument.<symbol>]` section, falling
/// back to the built-in schedule for known instruments.
///
/// `trade_into_backmonth` resolves as CLI override, then the instrument
/// section, then `[run]`, defaulting to true.
pub fn build_instrument_config(
    config: &dyn ConfigPort,
    symbol: &str,
    backmonth_override: Option<bool>,
) -> Result<InstrumentConfig, BackadjustError> {
    validate_instrument_config(config, symbol)?;
    let section = instrument_section(symbol);

    let run_default = config.get_bool("run", "trade_into_backmonth", true);
    let backmonth = backmonth_override.unwrap_or_else(|| {
        config.get_bool(&section, "trade_into_backmonth", run_default)
    });

    let builtin = InstrumentConfig::builtin(symbol, backmonth);

    let roll_months = match config.get_string(&section, "roll_months") {
        Some(value) => parse_month_codes(&value).map_err(|e| BackadjustError::ConfigInvalid {
            section: section.clone(),
            key: "roll_months".into(),
            reason: e.to_string(),
        })?,
        None => match &builtin {
            Some(b) => b.roll_months.clone(),
            None => {
                return Err(BackadjustError::ConfigMissing {
                    section,
                    key: "roll_months".into(),
                });
            }
        },
    };

    let builtin_lead = builtin.as_ref().map(|b| b.roll_lead_trading_days);
    let roll_lead_trading_days = match config.get_string(&section, "roll_lead_trading_days") {
        Some(value) => value
            .trim()
            .parse::<u32>()
            .map_err(|_| BackadjustError::ConfigInvalid {
                section: section.clone(),
                key: "roll_lead_trading_days".into(),
                reason: "roll_lead_trading_days must be a non-negative integer".into(),
            })?,
        None => builtin_lead.ok_or_else(|| BackadjustError::ConfigMissing {
            section: section.clone(),
            key: "roll_lead_trading_days".into(),
        })?,
    };

    Ok(InstrumentConfig {
        symbol: symbol.to_uppercase(),
        roll_months,
        roll_lead_trading_days,
        trade_into_backmonth: backmonth,
    })
}

fn data_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("data", "dir")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
    )
}

fn output_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("data", "output_dir")
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
    )
}

/// Instruments to process, named as the data port lists them.
///
/// An override matches a listed instrument ignoring case; one that matches
/// nothing is passed through as given.
pub fn resolve_instruments(
    symbol_override: Option<&str>,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, BackadjustError> {
    let listed = data_port.list_instruments()?;
    match symbol_override {
        Some(s) => {
            let s = s.trim();
            let source = listed
                .into_iter()
                .find(|name| name.eq_ignore_ascii_case(s))
                .unwrap_or_else(|| s.to_string());
            Ok(vec![source])
        }
        None => Ok(listed),
    }
}

/// Build and write every instrument's series.
///
/// Instruments are independent: a failing one is reported and the rest still
/// run. The exit code is that of the first failure.
pub fn run_pipeline(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    sinks: &[&dyn SeriesPort],
    instruments: &[String],
    calendar: &TradingCalendar,
    today: NaiveDate,
    backmonth_override: Option<bool>,
) -> ExitCode {
    let mut first_failure: Option<ExitCode> = None;
    let mut built = 0usize;

    for symbol in instruments {
        let result = build_instrument_config(config, symbol, backmonth_override).and_then(
            |instrument| {
                eprintln!(
                    "Processing {} (roll months {}, lead {} trading days, {})",
                    instrument.symbol,
                    instrument.roll_months_display(),
                    instrument.roll_lead_trading_days,
                    if instrument.trade_into_backmonth {
                        "back month"
                    } else {
                        "front month"
                    }
                );
                run_instrument(data_port, symbol, &instrument, calendar, today)
            },
        );

        let run = match result {
            Ok(run) => run,
            Err(e) => {
                eprintln!("error: {symbol}: {e}");
                first_failure.get_or_insert(ExitCode::from(&e));
                continue;
            }
        };

        for diagnostic in run.diagnostics() {
            eprintln!("  warning: {diagnostic}");
        }
        for roll in &run.adjustment.rolls {
            eprintln!(
                "  roll {} -> {} on {}: {:+.4} (cumulative {:+.4})",
                roll.outgoing.symbol,
                roll.incoming.symbol,
                roll.roll_date,
                roll.differential,
                roll.cumulative_differential
            );
        }

        for sink in sinks {
            match sink.write(&run.instrument, &run.adjustment.series) {
                Ok(paths) => {
                    for path in paths {
                        eprintln!("  wrote {}", path.display());
                    }
                }
                Err(e) => {
                    eprintln!("error: {symbol}: {e}");
                    first_failure.get_or_insert(ExitCode::from(&e));
                }
            }
        }
        built += 1;
    }

    eprintln!("Built {built} of {} instrument(s)", instruments.len());
    first_failure.unwrap_or(ExitCode::SUCCESS)
}

fn run_build(
    config_path: &Path,
    symbol: Option<&str>,
    backmonth: Option<bool>,
    plot: bool,
    as_of: Option<NaiveDate>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&config) {
        return fail(e);
    }

    // Stage 2: Calendar and evaluation date
    let calendar = match build_calendar(&config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let today = match resolve_today(&config, as_of) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    eprintln!(
        "As of {today}, calendar {}",
        calendar.jurisdiction()
    );

    // Stage 3: Discover instruments
    let data_port = CsvAdapter::new(data_dir(&config));
    let instruments = match resolve_instruments(symbol, &data_port) {
        Ok(list) if list.is_empty() => {
            return fail(BackadjustError::NoData {
                symbol: data_dir(&config).display().to_string(),
            });
        }
        Ok(list) => list,
        Err(e) => return fail(e),
    };

    // Stage 4: Build and write
    let out = output_dir(&config);
    let csv_writer = CsvSeriesWriter::new(out.clone());
    let chart_writer = SvgChartWriter::new(out);
    let mut sinks: Vec<&dyn SeriesPort> = vec![&csv_writer];
    if plot || config.get_bool("run", "plot", false) {
        sinks.push(&chart_writer);
    }

    run_pipeline(
        &config,
        &data_port,
        &sinks,
        &instruments,
        &calendar,
        today,
        backmonth,
    )
}

fn run_contracts(
    config_path: &Path,
    symbol: &str,
    backmonth: Option<bool>,
    as_of: Option<NaiveDate>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let symbol = symbol.trim().to_uppercase();

    let result = validate_run_config(&config)
        .and_then(|_| resolve_today(&config, as_of))
        .and_then(|today| {
            let instrument = build_instrument_config(&config, &symbol, backmonth)?;
            let data_port = CsvAdapter::new(data_dir(&config));
            let sources = resolve_instruments(Some(&symbol), &data_port)?;
            let mut raw = Vec::new();
            for source in &sources {
                raw.extend(data_port.fetch_contracts(source)?);
            }
            let repo = ContractRepository::load_chain(&symbol, raw, today)?;
            Ok((today, select_contracts(&repo, &instrument, today)))
        });

    let (today, selection) = match result {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    println!("Active rollable contracts for {symbol} as of {today}:");
    for contract in &selection.active_rollable {
        let marker = if selection.trading.as_ref() == Some(contract) {
            "*"
        } else {
            " "
        };
        println!("{marker} {:<12} expires {}", contract.symbol, contract.expiration);
    }
    match &selection.trading {
        Some(trading) => println!("Trading contract: {}", trading.symbol),
        None => println!("Trading contract: none"),
    }
    for diagnostic in &selection.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_run_config(&config) {
        return fail(e);
    }

    let sections = config.sections_with_prefix(INSTRUMENT_PREFIX);
    for section in &sections {
        let symbol = section.trim_start_matches(INSTRUMENT_PREFIX);
        if let Err(e) = build_instrument_config(&config, symbol, None) {
            return fail(e);
        }
    }

    eprintln!(
        "Config is valid ({} instrument section(s))",
        sections.len()
    );
    ExitCode::SUCCESS
}
