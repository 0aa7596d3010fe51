use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dalvik_inspect::{inspect, DEFAULT_METHOD_NAME};
use dalvik_inspect_zip::unzip;
use log::info;

const MANIFEST_FILE_NAME: &str = "AndroidManifest.xml";

/// Extracts an APK and prints the facts it can recover from its manifest
/// and DEX bytecode.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Archive to extract before inspecting. When omitted, `--out` is
    /// assumed to already hold an extracted APK.
    #[arg(long)]
    apk: Option<PathBuf>,

    /// Extraction target, and the directory scanned for `*.dex` files.
    #[arg(long, default_value = "./testdata")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if let Some(apk) = &cli.apk {
        unzip(apk, &cli.out).with_context(|| format!("failed to extract {}", apk.display()))?;
        info!("extracted {} to {}", apk.display(), cli.out.display());
    }

    let manifest_path = cli.out.join(MANIFEST_FILE_NAME);
    let inspection = inspect(&manifest_path, &cli.out, DEFAULT_METHOD_NAME)
        .with_context(|| format!("failed to inspect {}", cli.out.display()))?;

    print_facts(&inspection);

    Ok(())
}

fn print_facts(inspection: &dalvik_inspect::Inspection) {
    let manifest = &inspection.manifest;
    println!("package: {}", manifest.package_name);
    println!("application class: {}", manifest.application_class_name);

    println!("permissions:");
    for permission in &manifest.uses_permissions {
        println!("  {permission}");
    }

    println!("activities:");
    for (name, exported) in &manifest.activities {
        println!("  {name} (exported={exported})");
    }

    println!("main activities:");
    for name in manifest.main_activities() {
        println!("  {name}");
    }

    println!("dex scan:");
    for outcome in &inspection.dex_outcomes {
        if outcome.found {
            if let Some(access_flags) = &outcome.access_flags {
                println!("  assess flag {access_flags}");
            }
            match outcome.returned {
                Some(value) => println!("  {} hit, returned {value}", outcome.path.display()),
                None => println!("  {} hit, no return value observed", outcome.path.display()),
            }
        } else {
            println!(
                "  {} not in {}",
                manifest.application_class_name,
                outcome.path.display()
            );
        }
    }
}
