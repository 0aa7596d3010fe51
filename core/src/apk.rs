use std::path::Path;

use dalvik_inspect_axml::AXML;
use dalvik_inspect_dex::{Avm, Dex, DexError};
use dalvik_inspect_zip::list_dex;
use log::{info, warn};

use crate::errors::InspectError;
use crate::models::{DexOutcome, Inspection};

/// Default method name the driver resolves when the caller doesn't ask for
/// a specific one, matching the shape of the repo's own `onCreate` examples.
pub const DEFAULT_METHOD_NAME: &str = "onCreate";

/// Decode `manifest_path`, then walk `.dex` files under `dex_dir` looking for
/// the manifest's application class. The first dex file whose class-def
/// resolves wins; later files are never consulted once the class lands,
/// even if `method_name` can't then be found inside it. A dex file that
/// fails to verify, or simply doesn't contain the class, is logged and
/// skipped rather than treated as fatal -- only the manifest parse is
/// allowed to abort the whole inspection.
pub fn inspect(
    manifest_path: &Path,
    dex_dir: &Path,
    method_name: &str,
) -> Result<Inspection, InspectError> {
    let manifest_bytes = std::fs::read(manifest_path)?;
    let manifest = AXML::new(&mut &manifest_bytes[..])?;

    let mut dex_outcomes = Vec::new();

    if manifest.application_class_name.is_empty() {
        warn!("manifest carries no application class name; skipping method resolution");
        return Ok(Inspection {
            manifest,
            dex_outcomes,
        });
    }

    for path in list_dex(dex_dir) {
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                warn!("{}: {err}", path.display());
                continue;
            }
        };

        let dex = match Dex::open(path.display().to_string(), data) {
            Ok(dex) => dex,
            Err(err) => {
                warn!("{}: failed to verify: {err}", path.display());
                continue;
            }
        };

        match dex.find_class_def(&manifest.application_class_name) {
            Ok(class_def) => {
                info!("{} in {}", manifest.application_class_name, path.display());
                let access_flags = class_def.access_flags.to_string();
                info!("assess flag {access_flags}");

                let returned = match dex
                    .find_method_id(method_name, class_def.class_idx)
                    .and_then(|method_idx| dex.read_method_code(class_def, method_idx))
                {
                    Ok(code_item) => Avm::new().run(&code_item.insns),
                    Err(err) => {
                        warn!("{}: {err}", path.display());
                        None
                    }
                };

                dex_outcomes.push(DexOutcome {
                    path,
                    found: true,
                    access_flags: Some(access_flags),
                    returned,
                });
                break;
            }
            Err(DexError::NotFound) => {
                warn!("{} not in {}", manifest.application_class_name, path.display());
                dex_outcomes.push(DexOutcome {
                    path,
                    found: false,
                    access_flags: None,
                    returned: None,
                });
            }
            Err(err) => {
                warn!("{}: {err}", path.display());
                dex_outcomes.push(DexOutcome {
                    path,
                    found: false,
                    access_flags: None,
                    returned: None,
                });
            }
        }
    }

    Ok(Inspection {
        manifest,
        dex_outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_is_io_error() {
        let result = inspect(
            Path::new("/nonexistent/AndroidManifest.xml"),
            Path::new("/nonexistent"),
            DEFAULT_METHOD_NAME,
        );
        assert!(matches!(result, Err(InspectError::Io(_))));
    }
}
