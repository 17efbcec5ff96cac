use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "secret_probe_lambda";
const LAMBDA_BINARY: &str = "probe_lambda";
const DIST_DIR: &str = "dist";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the secret probe workspace",
    long_about = "Builds and packages the probe Lambda, runs CI checks,\n\
                  and runs the live tests against real or mocked services."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the probe Lambda and zip it as a `bootstrap` archive
    ServerlessPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Directory the archive is written to
        #[arg(long, env = "PROBE_DIST_DIR", default_value = DIST_DIR)]
        dist_dir: PathBuf,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci,
    /// Run ignored tests that need SECRET_ID, HOST and live services
    LiveTest,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn run_cargo(args: &[&str]) {
    eprintln!("+ cargo {}", args.join(" "));
    match Command::new("cargo").args(args).status() {
        Ok(status) if status.success() => {}
        Ok(status) => exit(status.code().unwrap_or(1)),
        Err(error) => {
            eprintln!("error: could not launch cargo: {error}");
            exit(1);
        }
    }
}

fn package_probe_lambda(target: &str, profile: BuildProfile, dist_dir: &Path) {
    ensure_rust_target_installed(target);

    step("Build probe lambda binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--target",
        target,
        "--bin",
        LAMBDA_BINARY,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(binary_name(LAMBDA_BINARY, target));
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let zip_path = dist_dir.join(format!("{LAMBDA_BINARY}.zip"));
    if let Err(error) = package_lambda_zip(&binary_path, &zip_path) {
        eprintln!(
            "error: failed to package '{}' into '{}': {error}",
            binary_path.display(),
            zip_path.display()
        );
        exit(1);
    }

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

/// Fails early with a hint when the cross target is missing. Skipped when
/// rustup is not available (for example on a toolchain installed by a distro).
fn ensure_rust_target_installed(target: &str) {
    let Ok(output) = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    else {
        return;
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && !installed.lines().any(|line| line.trim() == target) {
        eprintln!("error: rust target `{target}` is missing; run `rustup target add {target}`");
        exit(1);
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

/// Writes `binary_path` into a new archive as an executable `bootstrap`,
/// the entry point name the `provided.al2023` runtime looks for.
fn package_lambda_zip(binary_path: &Path, zip_path: &Path) -> ZipResult<()> {
    let binary = fs::read(binary_path)?;
    let mut zip = ZipWriter::new(fs::File::create(zip_path)?);
    zip.start_file(
        "bootstrap",
        FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o755),
    )?;
    zip.write_all(&binary)?;
    zip.finish()?;
    Ok(())
}

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test secret_probe_core");
    run_cargo(&["test", "-p", "secret_probe_core"]);

    step("Test secret_probe_lambda");
    run_cargo(&["test", "-p", LAMBDA_PACKAGE]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::ServerlessPackage {
            target,
            profile,
            dist_dir,
        } => {
            package_probe_lambda(&target, profile, &dist_dir);
        }
        Commands::Ci => {
            ci_check();
            eprintln!("\nCI job passed.");
        }
        Commands::LiveTest => {
            run_cargo(&[
                "test",
                "-p",
                LAMBDA_PACKAGE,
                "--test",
                "live_probe",
                "--",
                "--ignored",
            ]);
        }
    }
}
