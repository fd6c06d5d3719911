//! `generate` and `inspect` orchestration.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use carpack_archive::{write_archive_with, ArchiveHeader, ArchiveReader, ArchiveSummary, TeeWriter};
use carpack_crypto::{PieceCommitment, PieceHasher};
use carpack_dag::{
    load_manifest, walk_single, BuildContext, DagBuilder, DagConfig, FsNode, PathMap,
    SummaryProjector,
};

use crate::mapping::{ArchiveMapping, BlockMapping};
use carpack_store::{BlockStore, FileBackedStore, InMemoryBlockStore, MetaSink};
use carpack_types::ContentId;

/// Everything `generate` needs, after flag and config resolution.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub input: String,
    pub single: bool,
    pub piece_size: u64,
    pub out_dir: PathBuf,
    pub tmp_dir: Option<PathBuf>,
    pub parent: PathBuf,
    pub config: DagConfig,
    /// Buffer leaf bytes in memory instead of referencing the source files.
    pub in_memory: bool,
}

/// The printed output record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutput {
    pub ipld: FsNode,
    pub data_cid: String,
    pub piece_cid: String,
    pub piece_size: u64,
    pub cid_map: PathMap,
}

/// Output record plus where things landed.
#[derive(Debug)]
pub struct GenerateReport {
    pub output: GenerateOutput,
    pub archive: PathBuf,
    pub archive_summary: ArchiveSummary,
    pub commitment: PieceCommitment,
}

pub fn proof_key(commitment: &PieceCommitment) -> String {
    format!("proofs/{}.proof.json", commitment.file_stem())
}

pub fn mapping_key(commitment: &PieceCommitment) -> String {
    format!("mappings/{}.mapping.json", commitment.file_stem())
}

pub fn generate(req: &GenerateRequest, meta: &dyn MetaSink) -> anyhow::Result<GenerateReport> {
    let mut entries = if req.single {
        walk_single(Path::new(&req.input))
    } else {
        load_manifest(&req.input)
    }
    .with_context(|| format!("reading input {}", req.input))?;

    let store: Box<dyn BlockStore> = if req.in_memory {
        Box::new(InMemoryBlockStore::new())
    } else {
        Box::new(FileBackedStore::new())
    };

    let mut builder = DagBuilder::new(BuildContext::new(store.as_ref(), req.config), &req.parent)?;
    if let Some(tmp) = &req.tmp_dir {
        builder = builder.with_tmp_dir(tmp);
    }
    let dag = builder.build(&mut entries).context("building dag")?;
    let ipld = SummaryProjector::new(store.as_ref())
        .project(&dag.root)
        .context("projecting summary")?;

    fs::create_dir_all(&req.out_dir)
        .with_context(|| format!("creating {}", req.out_dir.display()))?;
    let staging = req.out_dir.join(format!("{}.car", Uuid::now_v7()));

    let (archive, archive_summary, commitment) =
        match write_and_commit(store.as_ref(), &dag.root, &staging, req, meta) {
            Ok(done) => done,
            Err(err) => {
                discard(&staging);
                return Err(err);
            }
        };

    info!(
        archive = %archive.display(),
        data_cid = %dag.root,
        piece = %commitment,
        piece_size = commitment.padded_size,
        "generate complete"
    );

    Ok(GenerateReport {
        output: GenerateOutput {
            ipld,
            data_cid: dag.root.to_string(),
            piece_cid: commitment.to_string(),
            piece_size: commitment.padded_size,
            cid_map: dag.path_map,
        },
        archive,
        archive_summary,
        commitment,
    })
}

/// Write the archive to `staging` while hashing it, save the commitment and
/// block mappings, then rename the archive after the piece commitment.
fn write_and_commit(
    store: &dyn BlockStore,
    root: &ContentId,
    staging: &Path,
    req: &GenerateRequest,
    meta: &dyn MetaSink,
) -> anyhow::Result<(PathBuf, ArchiveSummary, PieceCommitment)> {
    let file = File::create(staging).with_context(|| format!("creating {}", staging.display()))?;
    let tee = TeeWriter::new(BufWriter::new(file), PieceHasher::new());
    let mut blocks = Vec::new();
    let (tee, summary) = write_archive_with(store, root, tee, |placement, block| {
        blocks.push(BlockMapping::new(placement, block, store.origin(&placement.id)?));
        Ok(())
    })
    .context("writing archive")?;

    let (buffered, hasher) = tee.into_inner();
    let file = buffered.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    let commitment = hasher.finish(req.piece_size).context("computing piece commitment")?;
    let mapping = ArchiveMapping {
        data_cid: *root,
        header: hex::encode(ArchiveHeader::new(vec![*root]).to_record()?),
        blocks,
    };
    meta.put(&proof_key(&commitment), &serde_json::to_vec_pretty(&commitment)?)
        .context("saving piece commitment")?;
    meta.put(&mapping_key(&commitment), &serde_json::to_vec_pretty(&mapping)?)
        .context("saving block mappings")?;

    let archive = req.out_dir.join(format!("{}.car", commitment.file_stem()));
    fs::rename(staging, &archive)
        .with_context(|| format!("renaming archive to {}", archive.display()))?;
    Ok((archive, summary, commitment))
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial archive"),
    }
}

/// Block listing for `inspect`.
#[derive(Clone, Debug, Serialize)]
pub struct InspectOutput {
    pub version: u64,
    pub roots: Vec<ContentId>,
    pub blocks: Vec<InspectBlock>,
    pub bytes: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct InspectBlock {
    pub id: ContentId,
    pub size: u64,
}

/// Read `path` and verify every block digest.
pub fn inspect(path: &Path) -> anyhow::Result<InspectOutput> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ArchiveReader::from_reader(BufReader::new(file))
        .with_context(|| format!("reading header of {}", path.display()))?;
    let version = reader.header().version;
    let report = reader
        .verify_all()
        .with_context(|| format!("verifying {}", path.display()))?;

    Ok(InspectOutput {
        version,
        roots: report.roots,
        blocks: report
            .blocks
            .into_iter()
            .map(|(id, size)| InspectBlock { id, size })
            .collect(),
        bytes: report.bytes,
    })
}
