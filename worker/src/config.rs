use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ArgMatches;
use serde_json;

use errors::*;
use wordcount::{Accumulation, SortOptions};

const DEFAULT_PARTITION_COUNT: u64 = 5;
const DEFAULT_SORT_CHUNK_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_SORT_MERGE_FAN_IN: usize = 16;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CANCEL_GRACE_SECS: u64 = 5;

/// `WordCountConfig` holds the settings shared by map and reduce tasks.
///
/// Every map and reduce of one job must agree on `partition_count`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WordCountConfig {
    pub partition_count: u64,
    /// Parent directory of the per-task scratch directories.
    pub scratch_directory: PathBuf,
    /// Approximate size of an in-memory sorted run.
    pub sort_chunk_bytes: usize,
    /// Maximum number of runs merged at once.
    pub sort_merge_fan_in: usize,
    pub accumulation: Accumulation,
    /// Timeout of HTTP document requests and of each read of their body. 0 disables it.
    pub fetch_timeout_secs: u64,
    /// How long a cancelled operation may take to unwind before the worker removes its scratch
    /// and exits.
    pub cancel_grace_secs: u64,
}

impl Default for WordCountConfig {
    fn default() -> Self {
        WordCountConfig {
            partition_count: DEFAULT_PARTITION_COUNT,
            scratch_directory: env::temp_dir(),
            sort_chunk_bytes: DEFAULT_SORT_CHUNK_BYTES,
            sort_merge_fan_in: DEFAULT_SORT_MERGE_FAN_IN,
            accumulation: Accumulation::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            cancel_grace_secs: DEFAULT_CANCEL_GRACE_SECS,
        }
    }
}

fn config_error<S: Into<String>>(detail: S) -> Error {
    ErrorKind::ConfigError(detail.into()).into()
}

impl WordCountConfig {
    /// Builds the configuration from the command line.
    ///
    /// Settings are applied in order of increasing precedence: defaults, the `--config` file,
    /// `--arg key=value` pairs, then `--partitions`.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = match matches.value_of("config") {
            Some(path) => WordCountConfig::from_file(Path::new(path))?,
            None => WordCountConfig::default(),
        };

        if let Some(args) = matches.values_of("arg") {
            for arg in args {
                config.apply_arg(arg)?;
            }
        }

        if let Some(partitions) = matches.value_of("partitions") {
            config.partition_count = partitions.parse().chain_err(|| {
                ErrorKind::ConfigError(format!("--partitions {} is not an integer", partitions))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).chain_err(|| {
            ErrorKind::ConfigError(format!("unable to open config file {:?}", path))
        })?;
        serde_json::from_reader(file).chain_err(|| {
            ErrorKind::ConfigError(format!("unable to parse config file {:?}", path))
        })
    }

    /// Applies one `key=value` override.
    ///
    /// The argument map is shared with the rest of the job, so unrecognised keys are ignored.
    pub fn apply_arg(&mut self, arg: &str) -> Result<()> {
        let mut parts = arg.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let value = match parts.next() {
            Some(value) => value.trim(),
            None => return Err(config_error(format!("argument {:?} is not key=value", arg))),
        };

        match key {
            "partition_count" => self.partition_count = parse_number(key, value)?,
            "scratch_directory" => self.scratch_directory = PathBuf::from(value),
            "sort_chunk_bytes" => self.sort_chunk_bytes = parse_number(key, value)?,
            "sort_merge_fan_in" => self.sort_merge_fan_in = parse_number(key, value)?,
            "fetch_timeout_secs" => self.fetch_timeout_secs = parse_number(key, value)?,
            "cancel_grace_secs" => self.cancel_grace_secs = parse_number(key, value)?,
            "accumulation" => {
                self.accumulation = serde_json::from_value(value.into()).chain_err(|| {
                    ErrorKind::ConfigError(format!(
                        "accumulation must be count_records or sum_values, got {:?}",
                        value
                    ))
                })?
            }
            _ => debug!("Ignoring unrecognised argument {}", key),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            return Err(config_error("partition_count must be at least 1"));
        }
        if self.sort_chunk_bytes == 0 {
            return Err(config_error("sort_chunk_bytes must be at least 1"));
        }
        if self.sort_merge_fan_in < 2 {
            return Err(config_error("sort_merge_fan_in must be at least 2"));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        match self.fetch_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }

    pub fn sort_options(&self) -> SortOptions {
        SortOptions {
            chunk_bytes: self.sort_chunk_bytes,
            merge_fan_in: self.sort_merge_fan_in,
        }
    }
}

fn parse_number<T: ::std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        config_error(format!("{} must be a non-negative integer, got {:?}", key, value))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use tempfile::NamedTempFile;
    use parser::build_app;
    use super::*;

    fn config_from(args: Vec<&str>) -> Result<WordCountConfig> {
        let matches = build_app().get_matches_from_safe(args).unwrap();
        WordCountConfig::from_matches(&matches)
    }

    #[test]
    fn defaults() {
        let config = config_from(vec!["worker", "map", "--task-id", "t", "--input", "x"]).unwrap();

        assert_eq!(5, config.partition_count);
        assert_eq!(Accumulation::CountRecords, config.accumulation);
        assert_eq!(SortOptions::default(), config.sort_options());
        assert_eq!(Some(Duration::from_secs(300)), config.fetch_timeout());
        assert_eq!(Duration::from_secs(5), config.cancel_grace());
    }

    #[test]
    fn timeouts_from_args() {
        let mut config = WordCountConfig::default();
        config.apply_arg("fetch_timeout_secs=0").unwrap();
        config.apply_arg("cancel_grace_secs=1").unwrap();

        assert_eq!(None, config.fetch_timeout());
        assert_eq!(Duration::from_secs(1), config.cancel_grace());
    }

    #[test]
    fn file_then_args_then_flags() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"partition_count": 8, "sort_merge_fan_in": 4, "sort_chunk_bytes": 1024}}"#
        ).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = config_from(vec![
            "worker",
            "--config",
            path.as_str(),
            "--arg",
            "sort_merge_fan_in=6",
            "--arg",
            "partition_count=9",
            "--arg",
            "accumulation=sum_values",
            "--partitions",
            "3",
            "map",
            "--task-id",
            "t",
            "--input",
            "x",
        ]).unwrap();

        assert_eq!(3, config.partition_count);
        assert_eq!(6, config.sort_merge_fan_in);
        assert_eq!(1024, config.sort_chunk_bytes);
        assert_eq!(Accumulation::SumValues, config.accumulation);
    }

    #[test]
    fn unknown_args_are_ignored() {
        let mut config = WordCountConfig::default();
        config.apply_arg("api_endpoint=https://example.com/x").unwrap();

        assert_eq!(WordCountConfig::default(), config);
    }

    #[test]
    fn rejects_malformed_args() {
        let mut config = WordCountConfig::default();

        assert!(config.apply_arg("partition_count").is_err());
        assert!(config.apply_arg("partition_count=many").is_err());
        assert!(config.apply_arg("accumulation=average").is_err());
    }

    #[test]
    fn rejects_unknown_file_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"partitions": 8}}"#).unwrap();

        assert!(WordCountConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn validation() {
        let mut config = WordCountConfig::default();
        config.partition_count = 0;
        match *config.validate().unwrap_err().kind() {
            ErrorKind::ConfigError(_) => {}
            ref kind => panic!("unexpected error kind {:?}", kind),
        }

        let mut config = WordCountConfig::default();
        config.sort_merge_fan_in = 1;
        assert!(config.validate().is_err());

        let mut config = WordCountConfig::default();
        config.sort_chunk_bytes = 0;
        assert!(config.validate().is_err());

        assert!(
            config_from(vec![
                "worker",
                "--partitions",
                "0",
                "map",
                "--task-id",
                "t",
                "--input",
                "x",
            ]).is_err()
        );
    }
}
