pub mod config;
pub mod output;

pub use config::CollectorConfig;

/// Command line flags.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<String>,
    /// Print the sensor catalog as JSON and exit.
    pub sensors: bool,
}

impl CliArgs {
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                parsed.config = args.next();
            } else if let Some(path) = arg.strip_prefix("--config=") {
                parsed.config = Some(path.to_string());
            } else if arg == "--sensors" {
                parsed.sensors = true;
            }
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_both_config_forms_and_sensors_flag() {
        assert_eq!(
            CliArgs::parse(args(&["--config", "a.toml", "--sensors"])),
            CliArgs {
                config: Some("a.toml".to_string()),
                sensors: true,
            }
        );
        assert_eq!(
            CliArgs::parse(args(&["--config=b.json"])).config.as_deref(),
            Some("b.json")
        );
        assert_eq!(CliArgs::parse(args(&[])), CliArgs::default());
    }
}
