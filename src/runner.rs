//! Test runner for mutation testing
//!
//! This module coordinates the mutation testing process:
//! - Generates and applies each mutation
//! - Writes the mutant over the source file and runs tests
//! - Restores the file and collects results

use std::io::{Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::codegen::{check_function, generate_source, mutate_tree, parse_source};
use crate::config::{Config, TargetConfig};
use crate::error::{MutationError, Result};
use crate::mutation::Mutation;
use crate::operator::OperatorRegistry;

/// Status of a mutation after testing
#[derive(Debug, Clone, PartialEq)]
pub enum MutationStatus {
    /// Tests failed - mutation was detected (good!)
    Killed,
    /// Tests passed - mutation was NOT detected (bad!)
    Survived,
    /// Tests timed out
    Timeout,
    /// Mutated code failed to compile
    CompileError,
    /// The mutant could not be produced or tested
    Error(String),
}

/// Result of running a single mutation
#[derive(Debug)]
pub struct MutationResult {
    /// Mutation number within its file, `None` when the file itself failed
    pub mutation_id: Option<usize>,
    pub file: PathBuf,
    pub operator: String,
    pub original: String,
    pub replacement: String,
    pub status: MutationStatus,
    pub duration: Duration,
    pub line: Option<usize>,
    pub details: Option<String>,
}

impl MutationResult {
    fn from_mutation(file: &Path, mutation: &Mutation) -> Self {
        Self {
            mutation_id: Some(mutation.id),
            file: file.to_path_buf(),
            operator: mutation.operator.clone(),
            original: mutation.original.clone(),
            replacement: mutation.replacement_source(),
            status: MutationStatus::Survived,
            duration: Duration::ZERO,
            line: Some(mutation.location.line),
            details: None,
        }
    }

    fn target_error(target: &TargetConfig, error: String, duration: Duration) -> Self {
        Self {
            mutation_id: None,
            file: target.file.clone(),
            operator: String::new(),
            original: String::new(),
            replacement: String::new(),
            status: MutationStatus::Error(error),
            duration,
            line: None,
            details: None,
        }
    }

    pub fn description(&self) -> String {
        format!(
            "{} -> {} [{}] in {}",
            self.original,
            self.replacement,
            self.operator,
            self.file.display()
        )
    }
}

/// Run mutation testing with the given configuration
pub fn run_mutation_tests(
    config: &Config,
    project_dir: &Path,
    verbose: bool,
) -> Result<Vec<MutationResult>> {
    let registry = config.settings.registry()?;
    let mut results = Vec::new();

    for target in &config.targets {
        if verbose {
            eprintln!("Mutating {}", target.description());
        }

        let stop = run_target(
            target,
            &registry,
            project_dir,
            config.settings.timeout,
            config.settings.fail_fast,
            verbose,
            &mut results,
        );
        if stop {
            tracing::info!("stopping at the first surviving mutant");
            break;
        }
    }

    Ok(results)
}

/// Test every mutant of one target, returning true if fail-fast triggered
fn run_target(
    target: &TargetConfig,
    registry: &OperatorRegistry,
    project_dir: &Path,
    timeout_secs: u64,
    fail_fast: bool,
    verbose: bool,
    results: &mut Vec<MutationResult>,
) -> bool {
    let start = Instant::now();
    let file_path = project_dir.join(&target.file);

    // Read original file content for restoration
    let original_content = match std::fs::read_to_string(&file_path) {
        Ok(content) => content,
        Err(e) => {
            results.push(MutationResult::target_error(
                target,
                format!("Failed to read file '{}': {}", file_path.display(), e),
                start.elapsed(),
            ));
            return false;
        }
    };

    let generator = target.generator(registry);
    let tree = match parse_source(&original_content, &target.file)
        .and_then(|tree| check_function(&tree, &generator, &target.file).map(|()| tree))
    {
        Ok(tree) => tree,
        Err(e) => {
            results.push(MutationResult::target_error(target, e.to_string(), start.elapsed()));
            return false;
        }
    };

    let outcome = mutate_tree(&tree, &generator, |mutation, mutated| {
        if verbose {
            eprintln!("Testing mutation #{}: {}", mutation.id, mutation.description());
        }
        let result = run_single_mutation(
            &file_path,
            &target.file,
            &original_content,
            mutation,
            mutated,
            project_dir,
            timeout_secs,
            verbose,
        );
        let survived = result.status == MutationStatus::Survived;
        results.push(result);

        Ok(if fail_fast && survived {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    });

    match outcome {
        Ok(summary) => {
            tracing::debug!(
                file = %target.file.display(),
                delivered = summary.delivered,
                cancelled = summary.cancelled,
                "target finished"
            );
            summary.cancelled
        }
        Err(e) => {
            results.push(MutationResult::target_error(target, e.to_string(), start.elapsed()));
            false
        }
    }
}

/// Run a single mutation test
#[allow(clippy::too_many_arguments)]
fn run_single_mutation(
    file_path: &Path,
    display_file: &Path,
    original_content: &str,
    mutation: &Mutation,
    mutated: &syn::File,
    project_dir: &Path,
    timeout_secs: u64,
    verbose: bool,
) -> MutationResult {
    let start = Instant::now();
    let mut result = MutationResult::from_mutation(display_file, mutation);

    // Write the mutated file
    if let Err(e) = write_atomically(file_path, &generate_source(mutated)) {
        result.status = MutationStatus::Error(e.to_string());
        result.duration = start.elapsed();
        return result;
    }

    // Run tests
    let test_result = run_cargo_test(project_dir, Duration::from_secs(timeout_secs), verbose);

    // Restore original file
    if let Err(e) = write_atomically(file_path, original_content) {
        tracing::error!(file = %file_path.display(), error = %e, "failed to restore original file");
        eprintln!("WARNING: Failed to restore original file: {}", e);
    }

    let (status, details) = match test_result {
        TestResult::Passed => (MutationStatus::Survived, None),
        TestResult::Failed(output) => (MutationStatus::Killed, Some(output)),
        TestResult::CompileError(output) => (MutationStatus::CompileError, Some(output)),
        TestResult::Timeout => (MutationStatus::Timeout, None),
        TestResult::Error(e) => (MutationStatus::Error(e.clone()), Some(e)),
    };

    result.status = status;
    result.details = details;
    result.duration = start.elapsed();
    result
}

/// Replace `path`'s content via a temporary file in the same directory
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let write_error = |e: std::io::Error| MutationError::WriteError {
        file: path.to_path_buf(),
        error: e.to_string(),
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_error)?;
    }
    tmp.write_all(content.as_bytes()).map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

enum TestResult {
    Passed,
    Failed(String),
    CompileError(String),
    Timeout,
    Error(String),
}

/// Run cargo test and return the result
fn run_cargo_test(project_dir: &Path, timeout: Duration, verbose: bool) -> TestResult {
    let mut cmd = Command::new("cargo");
    cmd.arg("test")
        .arg("--no-fail-fast")
        .current_dir(project_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if !verbose {
        cmd.arg("--quiet");
    }

    // Own process group, so a timeout also reaches the test binaries
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return TestResult::Error(format!("Failed to run cargo test: {}", e)),
    };

    // Drain pipes concurrently so a chatty test run can't block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_with_timeout(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "cargo test timed out");
            return TestResult::Timeout;
        }
        Err(e) => return TestResult::Error(format!("Failed to wait for cargo test: {}", e)),
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    let combined = format!("{}\n{}", stdout, stderr);

    if status.success() {
        TestResult::Passed
    } else if stderr.contains("error[E")
        || stderr.contains("could not compile")
        || stderr.contains("aborting due to")
    {
        TestResult::CompileError(combined)
    } else {
        TestResult::Failed(combined)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut out = String::new();
        if let Some(mut pipe) = pipe {
            let mut bytes = Vec::new();
            if pipe.read_to_end(&mut bytes).is_ok() {
                out = String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        out
    })
}

/// Wait for `child`, killing it once `timeout` elapses
///
/// On Unix the whole process group led by `child` is killed, which takes
/// down the test binaries cargo spawned. Elsewhere only `child` is killed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_tree(child)?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    let group = libc::pid_t::try_from(child.id())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: plain syscall; a negative pid addresses the group `child` leads
    if unsafe { libc::kill(-group, libc::SIGKILL) } != 0 {
        let err = std::io::Error::last_os_error();
        // Group already gone
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// Validate all targets without running tests
pub fn validate_targets(config: &Config, project_dir: &Path) -> Vec<Result<()>> {
    let registry = config.settings.registry().ok();
    config
        .targets
        .iter()
        .map(|target| crate::config::validate_target(target, project_dir, registry.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "fn a() {}\n").unwrap();

        write_atomically(&path, "fn b() {}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fn b() {}\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_grandchildren() {
        use std::os::unix::process::CommandExt;

        // The backgrounded sleep inherits stdout; EOF only arrives once it is dead
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("sleep 30 & wait")
            .stdout(Stdio::piped())
            .process_group(0)
            .spawn()
            .unwrap();
        let mut stdout = child.stdout.take().unwrap();

        let start = Instant::now();
        let status = wait_with_timeout(&mut child, Duration::from_millis(200)).unwrap();
        assert!(status.is_none());

        let mut rest = Vec::new();
        stdout.read_to_end(&mut rest).unwrap();
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_unreadable_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let target = TargetConfig {
            file: PathBuf::from("missing.rs"),
            function: None,
        };
        let registry = OperatorRegistry::builtin();
        let mut results = Vec::new();

        let stop = run_target(&target, &registry, dir.path(), 1, false, false, &mut results);

        assert!(!stop);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].status, MutationStatus::Error(_)));
        assert_eq!(results[0].mutation_id, None);
    }

    #[test]
    fn test_unknown_function_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn a() -> i32 { 1 + 2 }\n").unwrap();
        let target = TargetConfig {
            file: PathBuf::from("lib.rs"),
            function: Some("b".to_string()),
        };
        let registry = OperatorRegistry::builtin();
        let mut results = Vec::new();

        run_target(&target, &registry, dir.path(), 1, false, false, &mut results);

        assert_eq!(results.len(), 1);
        let MutationStatus::Error(message) = &results[0].status else {
            panic!("expected an error status");
        };
        assert!(message.contains("Function 'b' not found"));
        // The file is left alone
        assert_eq!(
            std::fs::read_to_string(dir.path().join("lib.rs")).unwrap(),
            "fn a() -> i32 { 1 + 2 }\n"
        );
    }

    #[test]
    fn test_validate_targets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "fn add() -> i32 { 1 + 2 }\n").unwrap();
        let config: Config = serde_yaml::from_str(
            r#"
version: "1.0"
targets:
  - file: lib.rs
    function: add
  - file: nope.rs
"#,
        )
        .unwrap();

        let results = validate_targets(&config, dir.path());
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(MutationError::FileNotFound { .. })));
    }
}
