use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for gridscript
#[derive(Parser, Debug)]
#[command(version, about = "gridscript")]
pub struct Args {
    /// CSV files to import as the first steps of the session
    pub files: Vec<PathBuf>,

    /// Apply a steps script (a JSON array of step parameters) after the imports
    #[arg(long = "script")]
    pub script: Option<PathBuf>,

    /// Replay a saved analysis by name before applying anything else
    #[arg(long = "analysis")]
    pub analysis: Option<String>,

    /// Save the resulting step history under this analysis name
    #[arg(long = "save-as")]
    pub save_as: Option<String>,

    /// Write the generated script to a file instead of stdout
    #[arg(long = "output")]
    pub output: Option<PathBuf>,

    /// Specify the delimiter to use when reading the files
    #[arg(long = "delimiter")]
    pub delimiter: Option<char>,

    /// Do not prefix generated blocks with description comments
    #[arg(long = "no-comments", action)]
    pub no_comments: bool,

    /// Emit one block per step without merging or eliding any code
    #[arg(long = "no-optimize", action)]
    pub no_optimize: bool,

    /// Write the default config file and exit
    #[arg(long = "init-config", action)]
    pub init_config: bool,
}
