use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "carpack",
    about = "Pack file manifests into deterministic content-addressed archives",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (generate defaults to json, inspect to text)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build an archive from a manifest or a single file/folder
    Generate(GenerateArgs),
    /// Verify an archive and list its blocks
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Manifest JSON file (`-` for stdin), or the file/folder to pack with --single
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Treat the input as one file or folder included in full
    #[arg(long)]
    pub single: bool,

    /// Target piece size in bytes, 0 for the smallest valid size
    #[arg(short = 's', long, default_value_t = 0)]
    pub piece_size: u64,

    /// Directory the archive and metadata are written to
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Stage each entry's byte range here before chunking
    #[arg(short, long)]
    pub tmp_dir: Option<PathBuf>,

    /// Parent path of the dataset; archive paths are relative to it
    #[arg(short, long)]
    pub parent: PathBuf,

    /// Leaf chunk size in bytes (overrides --config)
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Maximum children per internal file node (overrides --config)
    #[arg(long)]
    pub max_links: Option<usize>,

    /// TOML file with chunk_size / max_links
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Buffer leaf chunks in memory instead of referencing the source files
    #[arg(long)]
    pub in_memory: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Archive to read
    pub archive: PathBuf,

    /// List every block
    #[arg(long)]
    pub blocks: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::parse_from([
            "carpack", "generate", "-i", "m.json", "-p", "/data", "-o", "out", "-s", "1024",
            "--max-links", "174", "--in-memory", "--format", "text",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Text));
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.input, "m.json");
                assert_eq!(args.parent, PathBuf::from("/data"));
                assert_eq!(args.piece_size, 1024);
                assert_eq!(args.max_links, Some(174));
                assert!(args.in_memory);
                assert!(!args.single);
                assert!(args.tmp_dir.is_none());
            }
            Command::Inspect(_) => panic!("expected generate"),
        }
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::parse_from(["carpack", "generate", "--parent", "."]);
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.input, "-");
                assert_eq!(args.piece_size, 0);
                assert_eq!(args.out_dir, PathBuf::from("."));
                assert!(!args.in_memory);
            }
            Command::Inspect(_) => panic!("expected generate"),
        }
    }

    #[test]
    fn parent_is_required() {
        assert!(Cli::try_parse_from(["carpack", "generate"]).is_err());
    }
}
