use anyhow::Context;
use colored::Colorize;

use carpack_dag::DagConfig;
use carpack_store::DirectoryMetaSink;

use crate::cli::*;
use crate::pipeline::{self, GenerateRequest};

/// Metadata directory under the output directory.
const METAS_DIR: &str = "metas";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Generate(args) => cmd_generate(args, cli.format.unwrap_or(OutputFormat::Json)),
        Command::Inspect(args) => cmd_inspect(args, cli.format.unwrap_or(OutputFormat::Text)),
    }
}

fn resolve_config(args: &GenerateArgs) -> anyhow::Result<DagConfig> {
    let mut config = match &args.config {
        Some(path) => DagConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DagConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(max_links) = args.max_links {
        config.max_links = max_links;
    }
    Ok(config)
}

fn cmd_generate(args: GenerateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let req = GenerateRequest {
        config: resolve_config(&args)?,
        input: args.input,
        single: args.single,
        piece_size: args.piece_size,
        out_dir: args.out_dir,
        tmp_dir: args.tmp_dir,
        parent: args.parent,
        in_memory: args.in_memory,
    };
    let sink = DirectoryMetaSink::new(req.out_dir.join(METAS_DIR));
    let report = pipeline::generate(&req, &sink)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.output)?);
        }
        OutputFormat::Text => {
            let out = &report.output;
            println!("{} Archive written", "✓".green().bold());
            println!("  Path: {}", report.archive.display().to_string().bold());
            println!("  Data CID: {}", out.data_cid.cyan());
            println!("  Piece CID: {}", out.piece_cid.yellow());
            println!(
                "  Piece size: {} ({} bytes unpadded)",
                out.piece_size,
                report.commitment.unpadded_size
            );
            println!(
                "  Blocks: {}, files: {}, directories: {}",
                report.archive_summary.blocks,
                out.cid_map.values().filter(|v| !v.is_directory).count(),
                out.cid_map.values().filter(|v| v.is_directory).count()
            );
        }
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let out = pipeline::inspect(&args.archive)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{} {} verified", "✓".green().bold(), args.archive.display().to_string().bold());
            println!("  Version: {}", out.version);
            for root in &out.roots {
                println!("  Root: {}", root.to_string().cyan());
            }
            println!("  Blocks: {}, bytes: {}", out.blocks.len(), out.bytes);
            if args.blocks {
                for block in &out.blocks {
                    println!("    {} {}", block.id.to_string().dimmed(), block.size);
                }
            }
        }
    }
    Ok(())
}
