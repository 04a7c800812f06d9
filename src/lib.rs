// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.
//! Move Helm chart releases between CNR registry channels.
//!
//! All registry work is done by a containerized registry client started with
//! `docker run`. This crate builds those invocations and runs them in order.
use anyhow::{bail, Result};
use argh::FromArgs;
use std::env;

pub mod registry;
pub mod write;

use crate::registry::{
    Credentials, Promotion, RegistryClient, Release, Step, DEFAULT_DOCKER, DEFAULT_REGISTRY,
    HELM_IMAGE,
};

const PROJECT_SUFFIX: &str = "-chart";

#[derive(FromArgs, Debug, PartialEq)]
/// Manage Helm chart channels in a CNR registry
pub struct Cli {
    #[argh(subcommand)]
    pub command: Commands,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
pub enum Commands {
    Promote(Promote),
    Login(Login),
}

#[derive(FromArgs, Debug, PartialEq)]
/// Move a chart release to another channel
#[argh(subcommand, name = "promote")]
pub struct Promote {
    /// target channel
    #[argh(option)]
    pub to: String,
    /// channel the release is promoted from
    #[argh(option)]
    pub from: Option<String>,
    /// chart version to release in the target channel
    #[argh(option)]
    pub version: String,
    /// username to log in to the registry.
    /// Defaults to $QUAY_USERNAME.
    #[argh(option, default = "env_or_empty(\"QUAY_USERNAME\")")]
    pub username: String,
    /// password to log in to the registry.
    /// Defaults to $QUAY_PASSWORD.
    #[argh(option, default = "env_or_empty(\"QUAY_PASSWORD\")")]
    pub password: String,
    /// chart project name.
    /// Defaults to $CIRCLE_PROJECT_REPONAME with a `-chart` suffix.
    #[argh(option, default = "default_project()")]
    pub project: String,
    /// organisation owning the chart.
    /// Defaults to $CIRCLE_PROJECT_USERNAME.
    #[argh(option, default = "env_or_empty(\"CIRCLE_PROJECT_USERNAME\")")]
    pub organisation: String,
    /// registry client image
    #[argh(option, default = "HELM_IMAGE.to_string()")]
    pub image: String,
    /// registry host
    #[argh(option, default = "DEFAULT_REGISTRY.to_string()")]
    pub registry: String,
    /// docker binary. Defaults to $DOCKER, then `docker`.
    #[argh(option, default = "default_docker()")]
    pub docker: String,
    /// print the commands instead of running them
    #[argh(switch)]
    pub dry_run: bool,
    /// print the dry run plan as JSON
    #[argh(switch)]
    pub json: bool,
}

#[derive(FromArgs, Debug, PartialEq)]
/// Log in to the registry, storing the token in ~/.cnr
#[argh(subcommand, name = "login")]
pub struct Login {
    /// username to log in to the registry.
    /// Defaults to $QUAY_USERNAME.
    #[argh(option, default = "env_or_empty(\"QUAY_USERNAME\")")]
    pub username: String,
    /// password to log in to the registry.
    /// Defaults to $QUAY_PASSWORD.
    #[argh(option, default = "env_or_empty(\"QUAY_PASSWORD\")")]
    pub password: String,
    /// registry client image
    #[argh(option, default = "HELM_IMAGE.to_string()")]
    pub image: String,
    /// registry host
    #[argh(option, default = "DEFAULT_REGISTRY.to_string()")]
    pub registry: String,
    /// docker binary. Defaults to $DOCKER, then `docker`.
    #[argh(option, default = "default_docker()")]
    pub docker: String,
    /// print the command instead of running it
    #[argh(switch)]
    pub dry_run: bool,
    /// print the dry run plan as JSON
    #[argh(switch)]
    pub json: bool,
}

fn env_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

fn default_project() -> String {
    match env::var("CIRCLE_PROJECT_REPONAME") {
        Ok(name) if !name.is_empty() => format!("{}{}", name, PROJECT_SUFFIX),
        _ => String::new(),
    }
}

fn default_docker() -> String {
    env::var("DOCKER")
        .ok()
        .filter(|docker| !docker.is_empty())
        .unwrap_or_else(|| DEFAULT_DOCKER.to_string())
}

/// Fail with every empty required value named at once
fn require(values: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = values
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(flag, _)| format!("--{}", flag))
        .collect();
    if !missing.is_empty() {
        bail!("Missing required value for {}", missing.join(", "));
    }
    Ok(())
}

impl Login {
    fn credentials(&self) -> Result<Credentials> {
        require(&[
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("image", self.image.as_str()),
            ("registry", self.registry.as_str()),
            ("docker", self.docker.as_str()),
        ])?;
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

impl Promote {
    fn validate(&self) -> Result<(Credentials, Promotion)> {
        require(&[
            ("to", self.to.as_str()),
            ("version", self.version.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("project", self.project.as_str()),
            ("organisation", self.organisation.as_str()),
            ("image", self.image.as_str()),
            ("registry", self.registry.as_str()),
            ("docker", self.docker.as_str()),
        ])?;
        if let Some(from) = &self.from {
            require(&[("from", from.as_str())])?;
            if from == &self.to {
                bail!("Source and target channel are both `{}`", self.to);
            }
        }
        let credentials = Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        let promotion = Promotion {
            release: Release {
                organisation: self.organisation.clone(),
                project: self.project.clone(),
                version: self.version.clone(),
            },
            to: self.to.clone(),
            from: self.from.clone(),
        };
        Ok((credentials, promotion))
    }
}

fn client(docker: &str, image: &str, host: &str) -> Result<RegistryClient> {
    Ok(RegistryClient {
        docker: docker.to_string(),
        image: image.to_string(),
        registry: host.to_string(),
        cnr_dir: registry::cnr_directory()?,
    })
}

/// Steps of a command, in the order they run
#[derive(Debug)]
pub struct Plan {
    pub client: RegistryClient,
    pub steps: Vec<Step>,
}

/// Build the steps for a command without running anything
pub fn plan(command: &Commands) -> Result<Plan> {
    match command {
        Commands::Login(login) => {
            let credentials = login.credentials()?;
            let client = client(&login.docker, &login.image, &login.registry)?;
            let steps = vec![client.login_step(&credentials)];
            Ok(Plan { client, steps })
        }
        Commands::Promote(promote) => {
            let (credentials, promotion) = promote.validate()?;
            let client = client(&promote.docker, &promote.image, &promote.registry)?;
            let steps = vec![
                client.login_step(&credentials),
                client.channel_step(&promotion),
            ];
            Ok(Plan { client, steps })
        }
    }
}

fn print_plan(steps: &[Step], json: bool) -> Result<()> {
    if json {
        let plan: Vec<_> = steps.iter().map(Step::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        for step in steps {
            println!("{}", step);
        }
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    let (dry_run, json) = match &cli.command {
        Commands::Promote(promote) => (promote.dry_run, promote.json),
        Commands::Login(login) => (login.dry_run, login.json),
    };
    let Plan { client, steps } = plan(&cli.command)?;

    if dry_run {
        for step in &steps {
            write::skipped("Would run", step.name)?;
        }
        return print_plan(&steps, json);
    }

    registry::ensure_cnr_directory(&client.cnr_dir)?;

    if let Commands::Promote(promote) = &cli.command {
        let from = promote.from.as_deref().unwrap_or("its current channel");
        write::ok(
            "Promoting",
            format!(
                "{}/{}@{} from {} to {}",
                promote.organisation, promote.project, promote.version, from, promote.to
            ),
        )?;
    }

    // Each step needs the previous one to have succeeded
    for step in &steps {
        write::ok("Running", step.name)?;
        step.run()?;
    }
    write::ok("Finished", format!("{} registry step(s)", steps.len()))?;
    Ok(())
}
