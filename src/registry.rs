// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.
//! Commands for the containerized CNR registry client.
use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Registry client image with the `registry` (appr) Helm plugin installed
pub const HELM_IMAGE: &str =
    "quay.io/giantswarm/docker-helm:006b0db51ec484be8b1bd49990804784a9737ece";
pub const DEFAULT_REGISTRY: &str = "quay.io";
pub const DEFAULT_DOCKER: &str = "docker";

const CNR_DIR: &str = ".cnr";
const CONTAINER_CNR_DIR: &str = "/root/.cnr";
const PASSWORD_FLAG: &str = "--password=";
const REDACTED: &str = "***";

/// How to reach the registry client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryClient {
    pub docker: String,
    pub image: String,
    pub registry: String,
    /// Host directory holding the CNR auth token, mounted into each container
    pub cnr_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A chart release in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub organisation: String,
    pub project: String,
    pub version: String,
}

impl Release {
    pub fn reference(&self, registry: &str) -> String {
        format!(
            "{}/{}/{}@{}",
            registry, self.organisation, self.project, self.version
        )
    }
}

/// Move `release` into channel `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub release: Release,
    pub to: String,
    pub from: Option<String>,
}

/// A single subprocess invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: &'static str,
    pub program: String,
    pub args: Vec<String>,
}

impl Step {
    /// Run the step to completion, passing its output through
    pub fn run(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .context(format!("Failed to start `{}` for {}", self.program, self.name))?;
        if !status.success() {
            bail!("{} failed: `{}` exited with {}", self.name, self.program, status);
        }
        Ok(())
    }

    /// Arguments with credentials masked
    pub fn redacted_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                if arg.starts_with(PASSWORD_FLAG) {
                    format!("{}{}", PASSWORD_FLAG, REDACTED)
                } else {
                    arg.clone()
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "step": self.name,
            "program": self.program,
            "args": self.redacted_args(),
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.redacted_args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl RegistryClient {
    /// `docker run -v <cnr>:/root/.cnr <image> registry <subcommand>`
    fn registry_args(&self, subcommand: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "-v".to_string(),
            format!("{}:{}", self.cnr_dir.display(), CONTAINER_CNR_DIR),
            self.image.clone(),
            "registry".to_string(),
            subcommand.to_string(),
        ]
    }

    pub fn login_step(&self, credentials: &Credentials) -> Step {
        let mut args = self.registry_args("login");
        args.extend([
            format!("--user={}", credentials.username),
            format!("{}{}", PASSWORD_FLAG, credentials.password),
            self.registry.clone(),
        ]);
        Step {
            name: "registry login",
            program: self.docker.clone(),
            args,
        }
    }

    pub fn channel_step(&self, promotion: &Promotion) -> Step {
        let mut args = self.registry_args("channel");
        args.extend([
            "--channel".to_string(),
            promotion.to.clone(),
            "--set-release".to_string(),
            promotion.release.reference(&self.registry),
        ]);
        Step {
            name: "registry channel",
            program: self.docker.clone(),
            args,
        }
    }
}

/// `~/.cnr` for the current user
pub fn cnr_directory() -> Result<PathBuf> {
    cnr_directory_in(dirs::home_dir())
}

fn cnr_directory_in(home: Option<PathBuf>) -> Result<PathBuf> {
    let home = home.ok_or_else(|| anyhow!("Cannot find home directory"))?;
    Ok(home.join(CNR_DIR))
}

/// Create the CNR directory so docker does not create it as root
pub fn ensure_cnr_directory(cnr_dir: &Path) -> Result<()> {
    fs::create_dir_all(cnr_dir).context(format!(
        "Failed to create CNR directory `{}`",
        cnr_dir.display()
    ))
}
