use anyhow::{Context, bail};
use async_trait::async_trait;
use depscan_model::{
    AnalyzerConfig, AnalyzerResult, PackageDescriptor, ScanOutcome,
    ScanSummary, ScannerDetails,
};
use std::{io::ErrorKind, path::Path, process::Stdio};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use super::{DependencyAnalyzer, PackageScanner};

/// Replace every `{key}` in each argument.
fn expand_args(args: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

/// Run a program to completion and return its stdout. A non-zero exit is an
/// error carrying the tail of stderr.
async fn run_captured(
    program: &str,
    args: &[String],
    envs: &[(&str, String)],
    stdin: Option<Vec<u8>>,
) -> anyhow::Result<Vec<u8>> {
    if program.trim().is_empty() {
        bail!("No program configured");
    }

    debug!(program, ?args, "spawning external tool");
    let mut child = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    if let Some(input) = stdin
        && let Some(mut pipe) = child.stdin.take()
    {
        // Tools that never read stdin may exit before the write lands.
        if let Err(err) = pipe.write_all(&input).await
            && err.kind() != ErrorKind::BrokenPipe
        {
            return Err(err)
                .with_context(|| format!("failed to write input to {program}"));
        }
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("failed to wait for {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{program} exited with {}: {}", output.status, stderr.trim());
    }

    Ok(output.stdout)
}

/// Dependency analysis delegated to an external program that prints an
/// [`AnalyzerResult`] as JSON (or `null`) on stdout.
///
/// Arguments may use `{source_dir}` and `{backends}` (comma separated).
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl DependencyAnalyzer for CommandAnalyzer {
    async fn analyze(
        &self,
        source_dir: &Path,
        backends: &[String],
        config: &AnalyzerConfig,
    ) -> anyhow::Result<Option<AnalyzerResult>> {
        let source_dir = source_dir.to_string_lossy();
        let backends = backends.join(",");
        let args = expand_args(
            &self.args,
            &[("source_dir", &*source_dir), ("backends", backends.as_str())],
        );
        let envs = [
            (
                "DEPSCAN_IGNORE_TOOL_VERSIONS",
                config.ignore_tool_versions.to_string(),
            ),
            (
                "DEPSCAN_ALLOW_DYNAMIC_VERSIONS",
                config.allow_dynamic_versions.to_string(),
            ),
        ];

        let stdout = run_captured(&self.program, &args, &envs, None).await?;
        serde_json::from_slice::<Option<AnalyzerResult>>(&stdout)
            .context("analyzer output is not a valid result document")
    }
}

/// Scanning delegated to an external program. The scan target descriptor is
/// written to stdin as JSON and a [`ScanSummary`] is expected on stdout.
///
/// Arguments may use `{output_dir}` and `{download_dir}`.
#[derive(Debug, Clone)]
pub struct CommandScanner {
    program: String,
    args: Vec<String>,
    details: ScannerDetails,
}

impl CommandScanner {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        details: ScannerDetails,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            details,
        }
    }
}

#[async_trait]
impl PackageScanner for CommandScanner {
    fn details(&self) -> ScannerDetails {
        self.details.clone()
    }

    async fn scan(
        &self,
        target: &PackageDescriptor,
        output_dir: &Path,
        download_dir: &Path,
    ) -> anyhow::Result<ScanOutcome> {
        let output_dir = output_dir.to_string_lossy();
        let download_dir = download_dir.to_string_lossy();
        let args = expand_args(
            &self.args,
            &[("output_dir", &*output_dir), ("download_dir", &*download_dir)],
        );
        let input = serde_json::to_vec(target)?;

        let stdout =
            run_captured(&self.program, &args, &[], Some(input)).await?;
        let summary: ScanSummary = serde_json::from_slice(&stdout)
            .context("scanner output is not a valid scan summary")?;

        Ok(ScanOutcome {
            scanner: self.details(),
            summary,
        })
    }
}
