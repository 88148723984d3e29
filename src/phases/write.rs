//! Phase 6: Writing to Disk
//!
//! This phase writes the output files of a run under a host directory. It is
//! only used when `--output-files` is given; otherwise documents go to
//! stdout.
//!
//! ## Process
//!
//! 1.  **Iterate Files**: Output files are written in output order.
//!
//! 2.  **Create Directories**: For each file, creates any necessary parent
//!     directories recursively.
//!
//! 3.  **Write Content**: Writes the file content to disk, replacing any
//!     existing file.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::evaluator::OutputFile;

/// Execute Phase 6: Write output files to disk
pub fn execute(files: &[OutputFile], output_path: &Path) -> Result<()> {
    fs::create_dir_all(output_path).map_err(|e| Error::Filesystem {
        message: format!(
            "Failed to create directory '{}': {}",
            output_path.display(),
            e
        ),
    })?;

    for file in files {
        let full_path = output_path.join(&file.path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }

        fs::write(&full_path, &file.content).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", full_path.display(), e),
        })?;
        debug!("wrote {}", full_path.display());
    }

    Ok(())
}
