use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::archive::{ExtractOptions, FailurePolicy};

#[derive(Parser, Debug)]
#[command(name = "runwa")]
#[command(version)]
#[command(about = "Extract NWA/NWK/OVK audio archives into WAV and Ogg files", long_about = None)]
#[command(after_help = "Examples:\n  \
  runwa --inputfile bgm01.nwa --outputpath out/        decode one NWA stream\n  \
  runwa --inputfile z0001.nwk --outputpath out/        extract every voice clip\n  \
  runwa --inputfile z0420.ovk --outputpath out/ --on-error collect")]
pub struct Cli {
    /// Path to the input file (.nwa, .nwk or .ovk)
    #[arg(long = "inputfile", value_name = "FILE")]
    pub input_file: PathBuf,

    /// Prefix for output files; end it with a separator to write into a directory
    #[arg(long = "outputpath", value_name = "PREFIX")]
    pub output_path: String,

    /// What to do when an entry fails
    #[arg(long = "on-error", value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_error: FailurePolicy,

    /// Maximum number of entries extracted at once (default: all)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<NonZeroUsize>,

    /// Directory for the dated log file (default: <exe dir>/log)
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Quiet mode: no per-entry console output
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            policy: self.on_error,
            max_concurrency: self.jobs,
        }
    }

    /// Reject empty required values, which clap lets through.
    pub fn check_required(&self) -> crate::Result<()> {
        if self.input_file.as_os_str().is_empty() {
            return Err(crate::Error::Usage(
                "You need to define an input file!".to_string(),
            ));
        }
        if self.output_path.is_empty() {
            return Err(crate::Error::Usage(
                "You need to define an output path!".to_string(),
            ));
        }
        Ok(())
    }
}
