use crate::dataset::Dataset;
use crate::fsio::{atomic_write_bytes, ensure_dir, link_or_copy, remove_dir_if_exists};
use crate::params::ParameterCombination;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

pub const STDOUT_FILE: &str = "raxml.stdout";
pub const STDERR_FILE: &str = "raxml.stderr";
pub const DKS_RESULTS_FILE: &str = "dks_results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    Succeeded,
    /// `code` is `None` when the process was killed by a signal.
    Failed { code: Option<i32> },
}

impl CellOutcome {
    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            CellOutcome::Succeeded
        } else {
            CellOutcome::Failed {
                code: status.code(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CellOutcome::Succeeded)
    }

    pub fn status_label(&self) -> String {
        match self {
            CellOutcome::Succeeded => "0".to_string(),
            CellOutcome::Failed { code: Some(c) } => c.to_string(),
            CellOutcome::Failed { code: None } => "signal".to_string(),
        }
    }
}

/// Everything one raxml-ng invocation needs besides the cell directory.
#[derive(Debug, Clone)]
pub struct CellInvocation<'a> {
    pub binary: &'a Path,
    pub dataset: &'a Dataset,
    pub combination: ParameterCombination,
    pub seed: u32,
    pub tree_count: u32,
    pub link_alignment: bool,
}

impl CellInvocation<'_> {
    pub fn args(&self, msa: &Path) -> Vec<String> {
        vec![
            "--tree".to_string(),
            format!("rand{{{}}}", self.tree_count),
            "--msa".to_string(),
            msa.to_string_lossy().to_string(),
            "--model".to_string(),
            self.dataset.sequence_type.model().to_string(),
            "--tip-inner".to_string(),
            self.combination.tip_inner.to_string(),
            "--site-repeats".to_string(),
            self.combination.site_repeats.to_string(),
            "--simd".to_string(),
            self.combination.simd.to_string(),
            "--seed".to_string(),
            self.seed.to_string(),
            "--force".to_string(),
        ]
    }

    /// Recreates `cell_dir` from scratch, puts the alignment in it and runs
    /// raxml-ng to completion. Only a failure to start the process is an
    /// error; a non-zero exit is reported through the outcome.
    pub fn run(&self, cell_dir: &Path) -> Result<CellOutcome> {
        remove_dir_if_exists(cell_dir)?;
        ensure_dir(cell_dir)?;
        let msa = cell_dir.join(self.dataset.file_name());
        link_or_copy(&self.dataset.msa, &msa, self.link_alignment).with_context(|| {
            format!(
                "failed to place alignment {} in {}",
                self.dataset.msa.display(),
                cell_dir.display()
            )
        })?;

        let stdout = fs::File::create(cell_dir.join(STDOUT_FILE))?;
        let stderr = fs::File::create(cell_dir.join(STDERR_FILE))?;
        let mut cmd = Command::new(self.binary);
        cmd.args(self.args(&msa));
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(stdout));
        cmd.stderr(Stdio::from(stderr));
        let status = cmd
            .status()
            .with_context(|| format!("failed to start {}", self.binary.display()))?;
        Ok(CellOutcome::from_status(status))
    }
}

/// Runs dks on the dataset alignment and stores its stdout verbatim.
/// Returns `false` without running anything when the binary is absent.
pub fn run_dks(binary: &Path, dataset: &Dataset, out_path: &Path) -> Result<bool> {
    if !binary.is_file() {
        return Ok(false);
    }
    let output = Command::new(binary)
        .arg("--msa")
        .arg(&dataset.msa)
        .arg("--states")
        .arg(dataset.sequence_type.states().to_string())
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("failed to start {}", binary.display()))?;
    if !output.status.success() {
        tracing::warn!(
            dataset = %dataset.name,
            status = ?output.status.code(),
            "dks exited unsuccessfully"
        );
    }
    atomic_write_bytes(out_path, &output.stdout)?;
    Ok(true)
}

fn run_checked(mut cmd: Command, what: &str) -> Result<()> {
    tracing::info!(command = ?cmd, "{}", what);
    let status = cmd
        .status()
        .with_context(|| format!("{}: failed to start", what))?;
    if !status.success() {
        return Err(anyhow!("{}: exited with status {:?}", what, status.code()));
    }
    Ok(())
}

/// Clones `url` into `dest` unless `dest` already exists.
pub fn fetch_repo(url: &str, dest: &Path) -> Result<bool> {
    if dest.exists() {
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    let mut cmd = Command::new("git");
    cmd.args(["clone", "--recursive", url]).arg(dest);
    run_checked(cmd, &format!("clone {}", url))?;
    Ok(true)
}

/// Configures and compiles a CMake checkout: `cmake -Bbuild -H.` in the
/// checkout, then `make` in its build directory.
pub fn build_checkout(checkout: &Path) -> Result<()> {
    if !checkout.is_dir() {
        return Err(anyhow!("checkout not found: {}", checkout.display()));
    }
    let mut configure = Command::new("cmake");
    configure.args(["-Bbuild", "-H."]).current_dir(checkout);
    run_checked(configure, &format!("configure {}", checkout.display()))?;

    let build_dir: PathBuf = checkout.join("build");
    let mut make = Command::new("make");
    make.current_dir(&build_dir);
    run_checked(make, &format!("build {}", checkout.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsio::temp_root;
    use crate::params::{Simd, Toggle};

    fn combo() -> ParameterCombination {
        ParameterCombination {
            tip_inner: Toggle::On,
            site_repeats: Toggle::Off,
            simd: Simd::Avx2,
        }
    }

    #[test]
    fn args_follow_raxml_command_template() {
        let dataset = Dataset::new("test-Datasets/Protein-Data/140/140.phy").unwrap();
        let inv = CellInvocation {
            binary: Path::new("raxml-ng/bin/raxml-ng"),
            dataset: &dataset,
            combination: combo(),
            seed: 42,
            tree_count: 1,
            link_alignment: true,
        };
        let args = inv.args(Path::new("cell/140.phy"));
        assert_eq!(
            args.join(" "),
            "--tree rand{1} --msa cell/140.phy --model lg --tip-inner on --site-repeats off --simd avx2 --seed 42 --force"
        );
    }

    #[test]
    fn outcome_labels_match_exit_codes() {
        assert_eq!(CellOutcome::Succeeded.status_label(), "0");
        assert_eq!(CellOutcome::Failed { code: Some(3) }.status_label(), "3");
        assert_eq!(CellOutcome::Failed { code: None }.status_label(), "signal");
        assert!(!CellOutcome::Failed { code: Some(1) }.is_success());
    }

    #[test]
    fn missing_dks_binary_is_skipped() {
        let root = temp_root("dks_missing");
        let dataset = Dataset::new(root.join("DNA-Data/125/125.phy")).unwrap();
        let out = root.join(DKS_RESULTS_FILE);
        let ran = run_dks(&root.join("no_such_dks"), &dataset, &out).unwrap();
        assert!(!ran);
        assert!(!out.exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_raxml_binary_is_an_error() {
        let root = temp_root("raxml_missing");
        let msa = root.join("DNA-Data").join("125.phy");
        ensure_dir(msa.parent().unwrap()).unwrap();
        fs::write(&msa, "2 4\nA ACGT\nB ACGT\n").unwrap();
        let dataset = Dataset::new(&msa).unwrap();
        let binary = root.join("no_such_raxml");
        let inv = CellInvocation {
            binary: &binary,
            dataset: &dataset,
            combination: combo(),
            seed: 7,
            tree_count: 1,
            link_alignment: false,
        };
        assert!(inv.run(&root.join(combo().cell_name())).is_err());
        let _ = fs::remove_dir_all(root);
    }

    #[cfg(unix)]
    #[test]
    fn run_captures_output_and_reports_exit_code() {
        use std::os::unix::fs::PermissionsExt;

        let root = temp_root("raxml_exit");
        let msa = root.join("DNA-Data").join("125.phy");
        ensure_dir(msa.parent().unwrap()).unwrap();
        fs::write(&msa, "2 4\nA ACGT\nB ACGT\n").unwrap();
        let script = root.join("fake-raxml");
        fs::write(&script, "#!/bin/sh\necho \"args: $*\"\necho oops >&2\nexit 3\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let dataset = Dataset::new(&msa).unwrap();
        let inv = CellInvocation {
            binary: &script,
            dataset: &dataset,
            combination: combo(),
            seed: 99,
            tree_count: 1,
            link_alignment: true,
        };
        let cell_dir = root.join("exp_125").join(combo().cell_name());
        ensure_dir(&cell_dir).unwrap();
        fs::write(cell_dir.join("stale.log"), "left over").unwrap();

        let outcome = inv.run(&cell_dir).expect("process starts");
        assert_eq!(outcome, CellOutcome::Failed { code: Some(3) });
        assert!(!cell_dir.join("stale.log").exists());
        let stdout = fs::read_to_string(cell_dir.join(STDOUT_FILE)).unwrap();
        assert!(stdout.contains("--seed 99"), "{}", stdout);
        assert_eq!(
            fs::read_to_string(cell_dir.join(STDERR_FILE)).unwrap(),
            "oops\n"
        );
        assert!(cell_dir
            .join("125.phy")
            .symlink_metadata()
            .unwrap()
            .file_type()
            .is_symlink());
        let _ = fs::remove_dir_all(root);
    }

    #[cfg(unix)]
    #[test]
    fn dks_stdout_is_stored_verbatim_with_state_count() {
        use std::os::unix::fs::PermissionsExt;

        let root = temp_root("dks_fake");
        let script = root.join("fake-dks");
        fs::write(
            &script,
            "#!/bin/sh\necho \"dks $*\"\nprintf 'difficulty: 0.31\\n'\necho noise >&2\nexit 2\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        for (path, states) in [
            ("test-Datasets/DNA-Data/125/125.phy", 4),
            ("test-Datasets/Protein-Data/140/140.phy", 20),
        ] {
            let dataset = Dataset::new(root.join(path)).unwrap();
            let out = root.join(format!("exp_{}", dataset.name)).join(DKS_RESULTS_FILE);
            ensure_dir(out.parent().unwrap()).unwrap();
            assert!(run_dks(&script, &dataset, &out).unwrap());
            assert_eq!(
                fs::read_to_string(&out).unwrap(),
                format!(
                    "dks --msa {} --states {}\ndifficulty: 0.31\n",
                    dataset.msa.display(),
                    states
                )
            );
        }
        let _ = fs::remove_dir_all(root);
    }
}
