//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use batchget_core::{DEFAULT_POOL_SIZE, Quality};

/// Concurrent multi-file download manager.
///
/// Batchget downloads a list of URLs in parallel with pause/stop control,
/// per-file progress, and batch filename assignment. Media-site URLs are
/// delegated to an external extraction tool when one is installed.
#[derive(Parser, Debug)]
#[command(name = "batchget")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download (reads stdin when omitted)
    pub urls: Vec<String>,

    /// Directory to save downloads into (created if missing)
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Worker pool size (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_POOL_SIZE as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Assign sequential names <PREFIX>_NNN.<ext> instead of URL-derived names
    #[arg(short = 'p', long)]
    pub batch_prefix: Option<String>,

    /// Template URL with '#' placeholders expanded over --start..--end
    #[arg(long)]
    pub template: Option<String>,

    /// First number substituted into the template
    #[arg(long, default_value_t = 1, requires = "template")]
    pub start: u32,

    /// Last number substituted into the template (inclusive)
    #[arg(long, default_value_t = 10, requires = "template")]
    pub end: u32,

    /// Zero-pad template numbers to this many digits
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10), requires = "template")]
    pub digits: Option<u8>,

    /// Quality selector for the external extraction tool
    #[arg(long, value_enum, default_value_t = Quality::Best)]
    pub quality: Quality,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parse() {
        let args = Args::try_parse_from(["batchget"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.concurrency, 5); // DEFAULT_POOL_SIZE
        assert_eq!(args.output, PathBuf::from("."));
        assert_eq!(args.quality, Quality::Best);
        assert!(args.batch_prefix.is_none());
        assert!(args.template.is_none());
    }

    #[test]
    fn test_cli_positional_urls() {
        let args = Args::try_parse_from([
            "batchget",
            "https://example.com/a.pdf",
            "https://example.com/b.pdf",
        ])
        .unwrap();
        assert_eq!(args.urls.len(), 2);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert!(Args::try_parse_from(["batchget", "-c", "1"]).is_ok());
        assert!(Args::try_parse_from(["batchget", "-c", "100"]).is_ok());

        let low = Args::try_parse_from(["batchget", "-c", "0"]);
        assert_eq!(
            low.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );

        let high = Args::try_parse_from(["batchget", "-c", "101"]);
        assert_eq!(
            high.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_batch_prefix_flag() {
        let args = Args::try_parse_from(["batchget", "-p", "Movie", "https://example.com/a.mp4"])
            .unwrap();
        assert_eq!(args.batch_prefix.as_deref(), Some("Movie"));
    }

    #[test]
    fn test_cli_template_with_range() {
        let args = Args::try_parse_from([
            "batchget",
            "--template",
            "https://example.com/img-#.jpg",
            "--start",
            "5",
            "--end",
            "20",
            "--digits",
            "3",
        ])
        .unwrap();
        assert_eq!(args.template.as_deref(), Some("https://example.com/img-#.jpg"));
        assert_eq!(args.start, 5);
        assert_eq!(args.end, 20);
        assert_eq!(args.digits, Some(3));
    }

    #[test]
    fn test_cli_range_flags_require_template() {
        let result = Args::try_parse_from(["batchget", "--start", "5"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_digits_zero_rejected() {
        let result = Args::try_parse_from([
            "batchget",
            "--template",
            "https://example.com/#.jpg",
            "--digits",
            "0",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_quality_values() {
        let args = Args::try_parse_from(["batchget", "--quality", "audio"]).unwrap();
        assert_eq!(args.quality, Quality::Audio);

        let args = Args::try_parse_from(["batchget", "--quality", "high"]).unwrap();
        assert_eq!(args.quality, Quality::High);
    }

    #[test]
    fn test_cli_invalid_quality_rejected() {
        let result = Args::try_parse_from(["batchget", "--quality", "ultra"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_and_quiet_flags() {
        let args = Args::try_parse_from(["batchget", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["batchget", "-q"]).unwrap();
        assert!(args.quiet);
    }
}
