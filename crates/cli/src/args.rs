//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rapid_client::api::DEFAULT_BASE_URL;

/// Upload 3D models to RapidPipeline, optimize them with every preset in
/// the presets file, and download the results.
#[derive(Parser, Debug, Clone)]
#[command(name = "rapid-cli", version, long_about = None)]
pub struct Args {
    /// Input directory, self-contained 3D model file (e.g. .glb or .zip),
    /// or base asset ID in the form `<number>.id`.
    pub model: String,

    /// API base URL.
    #[arg(
        short = 'b',
        long,
        env = "RAPIDPIPELINE_BASE_URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Credentials JSON file.
    #[arg(short = 'c', long, default_value = "credentials.json")]
    pub credentials_file: PathBuf,

    /// Preset definitions JSON file.
    #[arg(short = 'p', long, default_value = "presets.json")]
    pub presets_file: PathBuf,

    /// Settings JSON file.
    #[arg(short = 's', long, default_value = "settings.json")]
    pub settings_file: PathBuf,

    /// Label for the model, used for upload and output file names.
    #[arg(short = 'l', long)]
    pub label: Option<String>,

    /// Delete uploaded and optimized assets after processing (default).
    #[arg(long, overrides_with = "no_cleanup")]
    cleanup: bool,

    /// Keep uploaded and optimized assets on the server.
    #[arg(long, overrides_with = "cleanup")]
    no_cleanup: bool,

    /// Stop the whole run on the first failure.
    #[arg(short = 'e', long = "exit")]
    pub exit_on_error: bool,

    /// Directory for downloaded artifacts.
    #[arg(short = 'o', long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Give up on a single processing or optimization wait after this many
    /// seconds. Waits are unbounded by default.
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,
}

impl Args {
    /// Whether cleanup runs. The last of `--cleanup`/`--no-cleanup` wins.
    pub fn cleanup(&self) -> bool {
        self.cleanup || !self.no_cleanup
    }

    /// Non-empty model label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rapid-cli").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["model.glb"]);
        assert_eq!(args.model, "model.glb");
        assert_eq!(args.credentials_file, PathBuf::from("credentials.json"));
        assert_eq!(args.presets_file, PathBuf::from("presets.json"));
        assert_eq!(args.settings_file, PathBuf::from("settings.json"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert!(args.cleanup());
        assert!(!args.exit_on_error);
        assert_eq!(args.label(), None);
        assert_eq!(args.max_wait(), None);
    }

    #[test]
    fn short_flags() {
        let args = parse(&[
            "-b", "http://localhost/api/", "-c", "c.json", "-p", "p.json", "-s", "s.json", "-l",
            "chair", "-e", "-o", "out", "42.id",
        ]);
        assert_eq!(args.base_url, "http://localhost/api/");
        assert_eq!(args.credentials_file, PathBuf::from("c.json"));
        assert_eq!(args.presets_file, PathBuf::from("p.json"));
        assert_eq!(args.settings_file, PathBuf::from("s.json"));
        assert_eq!(args.label(), Some("chair"));
        assert!(args.exit_on_error);
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.model, "42.id");
    }

    #[test]
    fn last_cleanup_flag_wins() {
        assert!(!parse(&["--no-cleanup", "m.glb"]).cleanup());
        assert!(parse(&["--no-cleanup", "--cleanup", "m.glb"]).cleanup());
        assert!(!parse(&["--cleanup", "--no-cleanup", "m.glb"]).cleanup());
    }

    #[test]
    fn empty_label_is_ignored() {
        assert_eq!(parse(&["-l", "", "m.glb"]).label(), None);
    }

    #[test]
    fn max_wait_in_seconds() {
        assert_eq!(
            parse(&["--max-wait", "600", "m.glb"]).max_wait(),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn model_is_required() {
        assert!(Args::try_parse_from(["rapid-cli"]).is_err());
    }
}
