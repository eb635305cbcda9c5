use anyhow::{Context, bail};
use async_trait::async_trait;
use depscan_model::{VcsInfo, VcsType};
use std::{path::Path, process::Stdio};
use tokio::{fs, process::Command};
use tracing::{debug, info};

use super::SourceFetcher;

/// Shallow, single-revision checkouts through the `git` command line.
#[derive(Debug, Clone)]
pub struct GitSourceFetcher {
    program: String,
}

impl Default for GitSourceFetcher {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitSourceFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> anyhow::Result<String> {
        debug!(dir = %dir.display(), ?args, "running git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git {} failed with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SourceFetcher for GitSourceFetcher {
    async fn fetch(
        &self,
        locator: &VcsInfo,
        dest: &Path,
        allow_moving_revision: bool,
    ) -> anyhow::Result<()> {
        let locator = locator.normalized();
        if locator.vcs_type != VcsType::Git {
            bail!(
                "Unsupported VCS type '{}' for {}; \
                 only Git repositories can be downloaded.",
                locator.vcs_type,
                locator.url
            );
        }

        let revision = locator
            .resolved_revision
            .clone()
            .unwrap_or_else(|| locator.revision.clone());
        if revision.is_empty() {
            bail!("No revision given for {}.", locator.url);
        }

        fs::create_dir_all(dest)
            .await
            .with_context(|| format!("cannot create {}", dest.display()))?;

        self.git(dest, &["init", "--quiet"]).await?;
        self.git(dest, &["remote", "add", "origin", &locator.url])
            .await?;

        if !allow_moving_revision {
            let heads = self
                .git(dest, &["ls-remote", "--heads", "origin", &revision])
                .await?;
            if !heads.trim().is_empty() {
                bail!(
                    "Revision '{revision}' of {} is a branch, \
                     but moving revisions are not allowed.",
                    locator.url
                );
            }
        }

        if !locator.path.is_empty() {
            self.git(dest, &["config", "core.sparseCheckout", "true"])
                .await?;
            let sparse = dest.join(".git").join("info").join("sparse-checkout");
            if let Some(parent) = sparse.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&sparse, format!("/{}/\n", locator.path))
                .await
                .with_context(|| {
                    format!("cannot write {}", sparse.display())
                })?;
        }

        self.git(
            dest,
            &["fetch", "--quiet", "--depth", "1", "origin", &revision],
        )
        .await
        .with_context(|| {
            format!("could not fetch revision '{revision}' of {}", locator.url)
        })?;
        self.git(dest, &["checkout", "--quiet", "FETCH_HEAD"]).await?;

        info!(
            url = %locator.url,
            %revision,
            path = %locator.path,
            "checked out sources"
        );
        Ok(())
    }
}
