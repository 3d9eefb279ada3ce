//! CLI integration tests.
//!
//! Tests cover:
//! - Instrument and calendar settings built from real INI files on disk
//! - Full run over a TradingView directory into CSV and SVG outputs
//! - Per-instrument failures not stopping the rest of the run

mod common;

use backadjust::adapters::chart_svg::SvgChartWriter;
use backadjust::adapters::csv_adapter::CsvAdapter;
use backadjust::adapters::csv_series_writer::CsvSeriesWriter;
use backadjust::adapters::file_config_adapter::FileConfigAdapter;
use backadjust::cli::{self, Cli, Command};
use backadjust::domain::calendar::TradingCalendar;
use backadjust::domain::error::BackadjustError;
use backadjust::ports::series_port::SeriesPort;
use common::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

/// ES and MES contract files around the March 2024 roll.
fn write_data(dir: &Path) {
    write_tradingview_csv(
        dir,
        "ES",
        "ESH2024",
        &[("2024-02-26", 99.0), ("2024-02-27", 100.0), ("2024-02-28", 101.0), ("2024-03-01", 103.0)],
    );
    write_tradingview_csv(
        dir,
        "ES",
        "ESM2024",
        &[("2024-02-26", 104.0), ("2024-02-27", 105.0), ("2024-02-28", 106.0), ("2024-06-10", 110.0)],
    );
    write_tradingview_csv(
        dir,
        "MES",
        "MESM2024",
        &[("2024-06-10", 5300.0), ("2024-06-11", 5301.0)],
    );
}

fn ini_for(data: &Path, out: &Path) -> String {
    format!(
        "[data]\ndir = {}\noutput_dir = {}\n\n[calendar]\ncountry = US\n\n[run]\ntrade_into_backmonth = false\nas_of = 2024-06-12\n\n[instrument.ES]\nroll_months = H,M,U,Z\nroll_lead_trading_days = 3\n",
        data.display(),
        out.display()
    )
}

mod config_loading {
    use super::*;

    #[test]
    fn build_calendar_from_file() {
        let file = write_temp_ini("[calendar]\ncountry = none\nholidays = 2024-02-27\n");
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let cal = cli::build_calendar(&config).unwrap();
        assert!(!cal.is_trading_day(date("2024-02-27")));
        assert!(cal.is_trading_day(date("2024-07-04")));
    }

    #[test]
    fn invalid_country_is_config_error() {
        let file = write_temp_ini("[calendar]\ncountry = Atlantis\n");
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let err = cli::build_calendar(&config).unwrap_err();
        assert!(matches!(err, BackadjustError::ConfigInvalid { .. }));
    }

    #[test]
    fn instrument_section_is_case_insensitive() {
        let file = write_temp_ini("[instrument.Es]\nroll_months = h, z\nroll_lead_trading_days = 7\n");
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        let inst = cli::build_instrument_config(&config, "ES", Some(true)).unwrap();
        assert_eq!(inst.roll_months_display(), "H,Z");
        assert_eq!(inst.roll_lead_trading_days, 7);
        assert!(inst.trade_into_backmonth);
    }

    #[test]
    fn missing_config_file_fails() {
        let code = cli::run(Cli {
            command: Command::Validate {
                config: "/nonexistent/backadjust.ini".into(),
            },
        });
        assert!(!is_success(code));
    }

    #[test]
    fn validate_rejects_bad_instrument() {
        let file = write_temp_ini("[instrument.zc]\nroll_months = W\n");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: file.path().to_path_buf(),
            },
        });
        assert!(!is_success(code));
    }

    #[test]
    fn validate_accepts_good_config() {
        let file = write_temp_ini(
            "[calendar]\ncountry = US\n[instrument.zc]\nroll_months = Z\nroll_lead_trading_days = 30\n",
        );
        let code = cli::run(Cli {
            command: Command::Validate {
                config: file.path().to_path_buf(),
            },
        });
        assert!(is_success(code));
    }
}

mod full_run {
    use super::*;

    #[test]
    fn run_writes_series_and_charts() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        write_data(data.path());
        let ini = write_temp_ini(&ini_for(data.path(), out.path()));

        let code = cli::run(Cli {
            command: Command::Run {
                config: ini.path().to_path_buf(),
                symbol: None,
                backmonth: None,
                plot: true,
                as_of: None,
            },
        });
        assert!(is_success(code));

        let es = fs::read_to_string(out.path().join("ES_continuous.csv")).unwrap();
        let lines: Vec<&str> = es.lines().collect();
        assert_eq!(lines[0], "date,unadjusted,backadjusted,contract");
        assert_eq!(lines[1], "2024-02-26,99.0,104.0,ESH2024");
        assert_eq!(lines[2], "2024-02-27,100.0,105.0,ESH2024");
        assert_eq!(lines[3], "2024-02-28,106.0,106.0,ESM2024");
        assert_eq!(lines[4], "2024-06-10,110.0,110.0,ESM2024");
        assert_eq!(lines.len(), 5);

        // MES uses its built-in schedule.
        let mes = fs::read_to_string(out.path().join("MES_continuous.csv")).unwrap();
        assert_eq!(mes.lines().count(), 3);

        for name in ["ES_unadjusted.svg", "ES_backadjusted.svg", "MES_backadjusted.svg"] {
            assert!(out.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn single_symbol_without_plot() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        write_data(data.path());
        let ini = write_temp_ini(&ini_for(data.path(), out.path()));

        let code = cli::run(Cli {
            command: Command::Run {
                config: ini.path().to_path_buf(),
                symbol: Some("es".into()),
                backmonth: Some(false),
                plot: false,
                as_of: Some(date("2024-06-12")),
            },
        });
        assert!(is_success(code));
        assert!(out.path().join("ES_continuous.csv").exists());
        assert!(!out.path().join("MES_continuous.csv").exists());
        assert!(!out.path().join("ES_unadjusted.svg").exists());
    }

    #[test]
    fn failing_instrument_does_not_stop_others() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        write_data(data.path());
        // No section and no built-in schedule for CL.
        write_tradingview_csv(data.path(), "CL", "CLF2025", &[("2024-06-10", 80.0)]);
        let ini = write_temp_ini(&ini_for(data.path(), out.path()));

        let code = cli::run(Cli {
            command: Command::Run {
                config: ini.path().to_path_buf(),
                symbol: None,
                backmonth: None,
                plot: false,
                as_of: None,
            },
        });
        assert!(!is_success(code));
        assert!(out.path().join("ES_continuous.csv").exists());
        assert!(out.path().join("MES_continuous.csv").exists());
        assert!(!out.path().join("CL_continuous.csv").exists());
    }

    #[test]
    fn pipeline_with_mock_port_and_csv_sink() {
        let out = tempfile::TempDir::new().unwrap();
        let port = MockDataPort::new().with_contract(
            "ES",
            contract("ESM2024", &[("2024-06-10", 110.0), ("2024-06-11", 111.0)]),
        );
        let config = FileConfigAdapter::from_string("").unwrap();
        let csv_writer = CsvSeriesWriter::new(out.path().to_path_buf());
        let chart_writer = SvgChartWriter::new(out.path().to_path_buf());
        let sinks: Vec<&dyn SeriesPort> = vec![&csv_writer, &chart_writer];

        let code = cli::run_pipeline(
            &config,
            &port,
            &sinks,
            &["ES".to_string()],
            &TradingCalendar::default(),
            date("2024-06-12"),
            Some(false),
        );
        assert!(is_success(code));
        let content = fs::read_to_string(out.path().join("ES_continuous.csv")).unwrap();
        assert!(content.contains("2024-06-11,111.0,111.0,ESM2024"));
    }

    #[test]
    fn contracts_command_lists_selection() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        write_data(data.path());
        let ini = write_temp_ini(&ini_for(data.path(), out.path()));

        let code = cli::run(Cli {
            command: Command::Contracts {
                config: ini.path().to_path_buf(),
                symbol: "es".into(),
                backmonth: None,
                as_of: None,
            },
        });
        assert!(is_success(code));

        let missing = cli::run(Cli {
            command: Command::Contracts {
                config: ini.path().to_path_buf(),
                symbol: "NQ".into(),
                backmonth: None,
                as_of: None,
            },
        });
        assert!(!is_success(missing));
    }

    #[test]
    fn resolve_instruments_lists_directories() {
        let data = tempfile::TempDir::new().unwrap();
        write_data(data.path());
        let port = CsvAdapter::new(data.path().to_path_buf());
        assert_eq!(cli::resolve_instruments(None, &port).unwrap(), vec!["ES", "MES"]);
        assert_eq!(cli::resolve_instruments(Some(" es "), &port).unwrap(), vec!["ES"]);
        assert_eq!(cli::resolve_instruments(Some(" zc "), &port).unwrap(), vec!["zc"]);
    }

    #[test]
    fn lowercase_instrument_directory_is_fetched_as_listed() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        write_tradingview_csv(
            data.path(),
            "mes",
            "MESM2024",
            &[("2024-06-10", 5300.0), ("2024-06-11", 5301.0)],
        );
        let port = CsvAdapter::new(data.path().to_path_buf());
        let instruments = cli::resolve_instruments(Some("MES"), &port).unwrap();
        assert_eq!(instruments, vec!["mes"]);

        let config = FileConfigAdapter::from_string("").unwrap();
        let csv_writer = CsvSeriesWriter::new(out.path().to_path_buf());
        let sinks: Vec<&dyn SeriesPort> = vec![&csv_writer];
        let code = cli::run_pipeline(
            &config,
            &port,
            &sinks,
            &instruments,
            &TradingCalendar::default(),
            date("2024-06-12"),
            Some(false),
        );
        assert!(is_success(code));
        let content = fs::read_to_string(out.path().join("MES_continuous.csv")).unwrap();
        assert!(content.contains("2024-06-11,5301.0,5301.0,MESM2024"));
    }
}
