use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::clusterer::Clustering;
use crate::error::{AniClusterError, Result};

/// Extensions tried when looking up a genome file by id.
pub const GENOME_FILE_EXTENSIONS: &[&str] = &["fna", "fasta", "fa"];

/// Write `representative<TAB>member` lines, the representative's own line
/// first in each cluster.
pub fn write_cluster_definition(path: &str, clustering: &Clustering) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(|e| AniClusterError::csv(path, e))?;
    for cluster in &clustering.clusters {
        wtr.write_record(&[&cluster.representative, &cluster.representative])
            .map_err(|e| AniClusterError::csv(path, e))?;
        for member in cluster
            .members
            .iter()
            .filter(|m| **m != cluster.representative)
        {
            wtr.write_record(&[&cluster.representative, member])
                .map_err(|e| AniClusterError::csv(path, e))?;
        }
    }
    wtr.flush().map_err(|e| AniClusterError::io(path, e))?;
    info!(
        "Wrote cluster definition of {} clusters to {}",
        clustering.clusters.len(),
        path
    );
    Ok(())
}

pub fn write_representative_list(path: &str, clustering: &Clustering) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| AniClusterError::io(path, e))?;
    let mut out = std::io::BufWriter::new(file);
    for rep in clustering.representatives() {
        writeln!(out, "{}", rep).map_err(|e| AniClusterError::io(path, e))?;
    }
    out.flush().map_err(|e| AniClusterError::io(path, e))?;
    Ok(())
}

/// Where a representative's sequence file is expected to be.
pub fn locate_genome_file(id: &str, genome_directory: Option<&str>) -> Option<PathBuf> {
    match genome_directory {
        None => {
            let path = PathBuf::from(id);
            if path.is_file() {
                Some(path)
            } else {
                None
            }
        }
        Some(dir) => {
            let dir = Path::new(dir);
            std::iter::once(dir.join(id))
                .chain(
                    GENOME_FILE_EXTENSIONS
                        .iter()
                        .map(|ext| dir.join(format!("{}.{}", id, ext))),
                )
                .find(|p| p.is_file())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepresentativeFileMode {
    Copy,
    Symlink,
}

/// Pick a destination name that doesn't clash with one already used,
/// appending `.N.ext` to clashing names.
fn unclashed_name(file_name: &str, used: &BTreeSet<String>) -> String {
    if !used.contains(file_name) {
        return file_name.to_string();
    }
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 1;
    loop {
        let candidate = if extension.is_empty() {
            format!("{}.{}", file_name, n)
        } else {
            format!("{}.{}.{}", file_name, n, extension)
        };
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(unix)]
fn symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(not(unix))]
fn symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::copy(source, destination).map(|_| ())
}

/// Copy or link each representative's file into `output_directory`. Files
/// that can't be found are skipped with a warning. Returns the number of
/// files placed.
pub fn write_representative_files(
    output_directory: &str,
    clustering: &Clustering,
    genome_directory: Option<&str>,
    mode: RepresentativeFileMode,
) -> Result<usize> {
    std::fs::create_dir_all(output_directory)
        .map_err(|e| AniClusterError::io(output_directory, e))?;
    let output = Path::new(output_directory);

    let mut used_names = BTreeSet::new();
    let mut clash_warned = false;
    let mut placed = 0usize;
    for rep in clustering.representatives() {
        let source = match locate_genome_file(rep, genome_directory) {
            Some(source) => source,
            None => {
                warn!("Could not find a sequence file for representative {}", rep);
                continue;
            }
        };
        let file_name = source
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| rep.to_string());
        let name = unclashed_name(&file_name, &used_names);
        if name != file_name && !clash_warned {
            warn!(
                "One or more sequence files have the same file name, so some outputs have been renamed e.g. {}",
                name
            );
            clash_warned = true;
        }
        let destination = output.join(&name);
        let dest_str = destination.to_string_lossy().into_owned();
        match mode {
            RepresentativeFileMode::Copy => {
                std::fs::copy(&source, &destination)
                    .map_err(|e| AniClusterError::io(&dest_str, e))?;
            }
            RepresentativeFileMode::Symlink => {
                let absolute = std::fs::canonicalize(&source)
                    .map_err(|e| AniClusterError::io(&source.to_string_lossy(), e))?;
                symlink(&absolute, &destination).map_err(|e| AniClusterError::io(&dest_str, e))?;
            }
        }
        debug!("Placed {} at {}", source.display(), dest_str);
        used_names.insert(name);
        placed += 1;
    }
    info!(
        "Placed {} of {} representative files in {}",
        placed,
        clustering.clusters.len(),
        output_directory
    );
    Ok(placed)
}

/// Plain text report of a clustering run.
pub fn write_summary(
    path: &str,
    clustering: &Clustering,
    threshold: f64,
    tool_name: &str,
) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| AniClusterError::io(path, e))?;
    let mut out = std::io::BufWriter::new(file);
    let io_err = |e| AniClusterError::io(path, e);

    writeln!(out, "Similarity clustering summary").map_err(io_err)?;
    writeln!(out, "{}", "=".repeat(50)).map_err(io_err)?;
    writeln!(out).map_err(io_err)?;
    writeln!(out, "Similarity tool: {}", tool_name).map_err(io_err)?;
    writeln!(out, "Total genomes: {}", clustering.num_entities()).map_err(io_err)?;
    writeln!(out, "Representatives: {}", clustering.clusters.len()).map_err(io_err)?;
    writeln!(out, "Threshold: {}%", threshold).map_err(io_err)?;
    writeln!(out).map_err(io_err)?;
    writeln!(out, "Representative genomes:").map_err(io_err)?;
    for rep in clustering.representatives() {
        writeln!(out, "  - {}", rep).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(())
}
