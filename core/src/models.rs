use std::path::PathBuf;

use dalvik_inspect_axml::ManifestFacts;

/// Outcome of trying to resolve and run the target class/method against a
/// single `.dex` file.
#[derive(Debug)]
pub struct DexOutcome {
    pub path: PathBuf,

    /// `true` iff the target class and method were both located in this file.
    pub found: bool,

    /// The resolved class's access flags, rendered (e.g. `[public final]`),
    /// when the application class itself was located in this file — even if
    /// the target method inside it wasn't.
    pub access_flags: Option<String>,

    /// The AVM's final printed register value, when `found` and the code
    /// item reached a `return`.
    pub returned: Option<i64>,
}

/// Everything learned from a single inspection pass: the decoded manifest
/// facts, plus a per-dex-file record of whether the target class/method was
/// found there (the driver tries each file in turn and stops at the first
/// hit — see [`crate::apk::inspect`]).
#[derive(Debug, Default)]
pub struct Inspection {
    pub manifest: ManifestFacts,
    pub dex_outcomes: Vec<DexOutcome>,
}

impl Inspection {
    /// `true` iff some dex file in [`Self::dex_outcomes`] located the target.
    pub fn resolved(&self) -> bool {
        self.dex_outcomes.iter().any(|outcome| outcome.found)
    }
}
