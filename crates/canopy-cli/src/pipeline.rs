//! Shared setup for `canopy check`/`canopy emit-ir`: wires a single source
//! file into a fresh [`canopy_db::QueryDb`].

use std::fs;
use std::path::Path;
use std::rc::Rc;

use canopy_db::{FileId, QueryDb};
use canopy_sema::StaticHostTypeProvider;

use crate::errors::CliError;

pub struct Loaded {
    pub db: QueryDb,
    pub file: FileId,
}

pub fn load(path: &Path, context_type: &str, context_type_json: &Path) -> Result<Loaded, CliError> {
    let source = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CliError::FileNotFound { path: path.to_path_buf() }
        } else {
            CliError::Io { path: path.to_path_buf(), source }
        }
    })?;

    let host_json = fs::read_to_string(context_type_json).map_err(|source| CliError::Io {
        path: context_type_json.to_path_buf(),
        source,
    })?;
    let host = StaticHostTypeProvider::from_json(&host_json)
        .map_err(|source| CliError::InvalidHostJson { path: context_type_json.to_path_buf(), source })?;

    let mut db = QueryDb::new();
    let file = FileId::new(path.display().to_string());
    db.set_source_text(file.clone(), Rc::<str>::from(source.as_str()));
    db.set_context_type(file.clone(), Rc::<str>::from(context_type));
    db.set_roslyn_compilation(file.clone(), host as Rc<dyn canopy_sema::HostTypeProvider>);

    Ok(Loaded { db, file })
}
