//! Mapping declared routes to files under the output folder.

use crate::models::SourceRecord;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("No route declared for {0:?}")]
    MissingRoute(PathBuf),

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a page lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub file: PathBuf,
    pub folder: PathBuf,
}

/// Resolve a route to an output file.
///
/// The base URL is stripped once from the front of the route, then one
/// leading `/`. Routes without `.html` are directories and get an
/// `index.html`:
///
/// ```
/// use pagesmith_core::route::resolve_route;
/// use std::path::Path;
///
/// let dest = resolve_route("/blog/post-1", "/blog", Path::new("out"));
/// assert_eq!(dest.file, Path::new("out/post-1/index.html"));
/// assert_eq!(dest.folder, Path::new("out/post-1"));
/// ```
pub fn resolve_route(route: &str, base_url: &str, output: &Path) -> Destination {
    let mut relative = route;
    if !base_url.is_empty() {
        relative = relative.strip_prefix(base_url).unwrap_or(relative);
    }
    relative = relative.strip_prefix('/').unwrap_or(relative);

    let mut file = if relative.is_empty() {
        output.to_path_buf()
    } else {
        output.join(relative)
    };
    if !relative.contains(".html") {
        file.push("index.html");
    }

    let folder = file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output.to_path_buf());
    Destination { file, folder }
}

/// Write the record's content to its route and remember where it went.
pub fn write_record(
    record: &mut SourceRecord,
    base_url: &str,
    output: &Path,
) -> Result<(), RouteError> {
    let route = record
        .route()
        .ok_or_else(|| RouteError::MissingRoute(record.filename.clone()))?;
    let dest = resolve_route(route, base_url, output);

    fs::create_dir_all(&dest.folder).map_err(|source| RouteError::Io {
        path: dest.folder.clone(),
        source,
    })?;
    fs::write(&dest.file, &record.content).map_err(|source| RouteError::Io {
        path: dest.file.clone(),
        source,
    })?;
    tracing::debug!("Wrote {:?}", dest.file);

    record.dest_filename = Some(dest.file);
    record.dest_folder = Some(dest.folder);
    Ok(())
}
