use anyhow::{Context, bail};
use clap::Parser;
use std::path::PathBuf;
use summands::{
    DEFAULT_BATCH_SIZE, DEFAULT_PAGES_PER_FILE, DEFAULT_ROWS_PER_PAGE, FinderConfig,
    SearchParameters, SinkLimits, Value, WriteMode,
    store::{XLSX_MAX_COLUMNS, XLSX_MAX_ROWS},
};

/// Largest summand count accepted unless `MAX_LENGTH` says otherwise. Longer
/// searches explode combinatorially.
pub const DEFAULT_MAX_LENGTH: usize = 7;

/// Command line configuration for the `summands` binary.
///
/// Every option can also be supplied through the environment (or a `.env`
/// file). Capacities default to one million rows per worksheet and five
/// worksheets per workbook.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "summands",
    version,
    about = "Enumerate strictly increasing summands of a target sum into paginated spreadsheets"
)]
pub struct CliArgs {
    /// Sum every combination must reach.
    ///
    /// Environment variable: `TARGET`
    #[arg(short, long, env = "TARGET")]
    pub target: Value,

    /// Number of summands in each combination.
    ///
    /// Environment variable: `LENGTH`
    #[arg(short, long, env = "LENGTH")]
    pub length: usize,

    /// Inclusive upper bound for every summand. `0` selects the default
    /// bound; a value above the target is treated as `0`.
    ///
    /// Environment variable: `UPPER_BOUND`
    #[arg(short, long, env = "UPPER_BOUND", default_value_t = 0)]
    pub upper_bound: Value,

    /// Directory that receives the `{target}-{length}-{bound}` output folder.
    /// Defaults to the directory of the executable.
    ///
    /// Environment variable: `OUTPUT_DIR`
    #[arg(short, long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum rows per worksheet.
    ///
    /// Environment variable: `ROWS_PER_PAGE`
    #[arg(long, env = "ROWS_PER_PAGE", default_value_t = DEFAULT_ROWS_PER_PAGE)]
    pub rows_per_page: usize,

    /// Maximum worksheets per workbook.
    ///
    /// Environment variable: `PAGES_PER_FILE`
    #[arg(long, env = "PAGES_PER_FILE", default_value_t = DEFAULT_PAGES_PER_FILE)]
    pub pages_per_file: usize,

    /// Number of combinations buffered in memory before they are written.
    ///
    /// Environment variable: `BATCH_SIZE`
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Largest accepted `--length`.
    ///
    /// Environment variable: `MAX_LENGTH`
    #[arg(long, env = "MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Search on a separate thread while the previous batch is being written.
    ///
    /// Environment variable: `PIPELINED`
    #[arg(long, env = "PIPELINED", default_value_t = false)]
    pub pipelined: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub params: SearchParameters,
    /// `true` when `--upper-bound` exceeded the target and was reset to `0`.
    pub bound_reset: bool,
    pub output_dir: PathBuf,
    pub finder: FinderConfig,
    pub json: bool,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.target == 0 {
            bail!("TARGET must be greater than 0");
        }

        if args.length == 0 {
            bail!("LENGTH must be greater than 0");
        }

        if args.max_length > XLSX_MAX_COLUMNS {
            bail!(
                "MAX_LENGTH ({}) exceeds the worksheet column limit ({})",
                args.max_length,
                XLSX_MAX_COLUMNS
            );
        }

        if args.length > args.max_length {
            bail!(
                "LENGTH ({}) exceeds MAX_LENGTH ({})",
                args.length,
                args.max_length
            );
        }

        if args.rows_per_page > XLSX_MAX_ROWS {
            bail!(
                "ROWS_PER_PAGE ({}) exceeds the worksheet row limit ({})",
                args.rows_per_page,
                XLSX_MAX_ROWS
            );
        }

        let limits = SinkLimits::new(args.rows_per_page, args.pages_per_file)?;
        let mode = if args.pipelined {
            WriteMode::Pipelined
        } else {
            WriteMode::Inline
        };
        let finder = FinderConfig::new(args.batch_size, limits, mode)?;

        let params = SearchParameters::normalized(args.target, args.length, args.upper_bound)?;
        let bound_reset = args.upper_bound != params.requested_bound();

        let output_dir = match args.output_dir {
            Some(dir) => dir,
            None => executable_dir()?,
        };

        Ok(Self {
            params,
            bound_reset,
            output_dir,
            finder,
            json: args.json,
        })
    }
}

fn executable_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    exe.parent()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("Executable path {} has no parent", exe.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(target: Value, length: usize, upper_bound: Value) -> CliArgs {
        CliArgs {
            target,
            length,
            upper_bound,
            output_dir: Some(PathBuf::from("out")),
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            pages_per_file: DEFAULT_PAGES_PER_FILE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_length: DEFAULT_MAX_LENGTH,
            pipelined: false,
            json: false,
        }
    }

    #[test]
    fn defaults_resolve_bound() {
        let config = RunConfig::try_from(args(5, 2, 0)).unwrap();
        assert_eq!(config.params.key(), "5-2-5");
        assert!(!config.bound_reset);
        assert_eq!(config.finder, FinderConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn bound_above_target_is_reset() {
        let config = RunConfig::try_from(args(5, 2, 9)).unwrap();
        assert!(config.bound_reset);
        assert_eq!(config.params.bound(), 5);

        let config = RunConfig::try_from(args(20, 3, 9)).unwrap();
        assert!(!config.bound_reset);
        assert_eq!(config.params.key(), "20-3-9");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(RunConfig::try_from(args(0, 2, 0)).is_err());
        assert!(RunConfig::try_from(args(5, 0, 0)).is_err());

        let err = RunConfig::try_from(args(50, 8, 0)).unwrap_err();
        assert!(err.to_string().contains("MAX_LENGTH"));

        let mut too_many_rows = args(5, 2, 0);
        too_many_rows.rows_per_page = XLSX_MAX_ROWS + 1;
        assert!(RunConfig::try_from(too_many_rows).is_err());

        let mut no_batch = args(5, 2, 0);
        no_batch.batch_size = 0;
        assert!(RunConfig::try_from(no_batch).is_err());

        let mut no_pages = args(5, 2, 0);
        no_pages.pages_per_file = 0;
        assert!(RunConfig::try_from(no_pages).is_err());
    }

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "summands",
            "--target",
            "30",
            "--length",
            "3",
            "--upper-bound",
            "12",
            "--output-dir",
            "/tmp/out",
            "--rows-per-page",
            "10",
            "--pages-per-file",
            "2",
            "--pipelined",
        ])
        .unwrap();

        let config = RunConfig::try_from(args).unwrap();
        assert_eq!(config.params.key(), "30-3-12");
        assert_eq!(config.finder.mode(), WriteMode::Pipelined);
        assert_eq!(config.finder.limits().rows_per_page(), 10);
        assert_eq!(config.finder.limits().pages_per_file(), 2);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn default_output_dir_is_next_to_executable() {
        let mut args = args(5, 2, 0);
        args.output_dir = None;
        let config = RunConfig::try_from(args).unwrap();
        let exe = std::env::current_exe().unwrap();
        assert_eq!(Some(config.output_dir.as_path()), exe.parent());
    }
}
