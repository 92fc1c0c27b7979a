//! Catalog loading by file extension, with the built-in fallback policy for callers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::builtin::builtin_catalog;
use crate::catalog::object::{parse_object_json, parse_object_yaml};
use crate::catalog::tabular::{parse_csv, read_workbook};
use crate::catalog::{Catalog, CatalogError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrigin {
    File(PathBuf),
    BuiltIn,
}

/// Informational notice: the configured source was unusable and the built-in catalog is in use.
#[derive(Debug, Error)]
#[error("could not load catalog from {}: {source}; using built-in data", .path.display())]
pub struct CatalogLoadFailure {
    pub path: PathBuf,
    #[source]
    pub source: CatalogError,
}

#[derive(Debug)]
pub struct CatalogLoad {
    pub catalog: Catalog,
    pub origin: CatalogOrigin,
    pub notice: Option<CatalogLoadFailure>,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Load a catalog from a file. `.json`/`.yaml`/`.yml` are object documents,
/// `.xlsx`/`.xlsm`/`.xls`/`.ods` are workbooks, anything else is read as CSV.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "json" => parse_object_json(&fs::read_to_string(path)?),
        "yaml" | "yml" => parse_object_yaml(&fs::read_to_string(path)?),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path)?.into_catalog(),
        _ => parse_csv(fs::File::open(path)?)?.into_catalog(),
    }
}

/// Load from `path` when given; on any failure (or when no path is configured) use the
/// built-in catalog. Failures come back as a notice for the caller to surface.
pub fn load_catalog_or_builtin(path: Option<&Path>) -> CatalogLoad {
    let Some(path) = path else {
        info!("no catalog source configured, using built-in catalog");
        return CatalogLoad {
            catalog: builtin_catalog(),
            origin: CatalogOrigin::BuiltIn,
            notice: None,
        };
    };

    match load_catalog(path) {
        Ok(catalog) => {
            info!(path = %path.display(), upgrades = catalog.len(), "catalog loaded");
            CatalogLoad {
                catalog,
                origin: CatalogOrigin::File(path.to_path_buf()),
                notice: None,
            }
        }
        Err(source) => {
            let notice = CatalogLoadFailure {
                path: path.to_path_buf(),
                source,
            };
            warn!("{notice}");
            CatalogLoad {
                catalog: builtin_catalog(),
                origin: CatalogOrigin::BuiltIn,
                notice: Some(notice),
            }
        }
    }
}
