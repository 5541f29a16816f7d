//! Cloud metadata probing: account / vpc / instance / local-ip / region,
//! from either `CLOUD_*` env vars or a helper script's stdout.

use crate::timeout::{probe, DEFAULT_PROBE_TIMEOUT};
use command_executor::event::ProcessEventType;
use command_executor::{backends::LocalLauncher, target::Target, Command, Executor};
use futures_lite::StreamExt;
use serde::{Deserialize, Serialize};

/// Cloud placement facts, each individually optional: any probe that fails
/// or times out leaves its field `None` rather than blocking resolution of
/// the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudMetadata {
    /// Cloud account id.
    pub account: Option<String>,
    /// VPC id.
    pub vpc: Option<String>,
    /// Instance id.
    pub instance: Option<String>,
    /// The host's local (private) IP address.
    pub local_ip: Option<String>,
    /// Cloud region.
    pub region: Option<String>,
}

impl CloudMetadata {
    /// Whether any cloud metadata at all was resolved.
    pub fn is_present(&self) -> bool {
        self.account.is_some()
            || self.vpc.is_some()
            || self.instance.is_some()
            || self.local_ip.is_some()
            || self.region.is_some()
    }

    /// Resolve from `CLOUD_*` environment variables, falling back to a
    /// helper script's stdout (one `key=value` pair per line) when an
    /// environment variable is absent.
    pub async fn resolve(helper_script: Option<&str>) -> Self {
        let mut fields = Self {
            account: std::env::var("CLOUD_ACCOUNT_ID").ok(),
            vpc: std::env::var("CLOUD_VPC_ID").ok(),
            instance: std::env::var("CLOUD_INSTANCE_ID").ok(),
            local_ip: std::env::var("CLOUD_LOCAL_IP").ok(),
            region: std::env::var("CLOUD_REGION").ok(),
        };

        if fields.is_present() || helper_script.is_none() {
            return fields;
        }

        if let Some(output) = probe(DEFAULT_PROBE_TIMEOUT, run_helper(helper_script.unwrap())).await {
            fields.merge_from_helper_output(&output);
        }
        fields
    }

    fn merge_from_helper_output(&mut self, output: &str) {
        for line in output.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                "account" => self.account = self.account.clone().or(value),
                "vpc" => self.vpc = self.vpc.clone().or(value),
                "instance" => self.instance = self.instance.clone().or(value),
                "local_ip" => self.local_ip = self.local_ip.clone().or(value),
                "region" => self.region = self.region.clone().or(value),
                _ => {}
            }
        }
    }
}

async fn run_helper(script: &str) -> Option<String> {
    let executor = Executor::new("details-resolver".to_string(), LocalLauncher);
    let cmd = Command::new(script);
    let (mut events, mut handle) = executor.spawn(&Target::Command, cmd).await.ok()?;

    let mut stdout = String::new();
    while let Some(event) = events.next().await {
        if event.event_type == ProcessEventType::Stdout {
            if let Some(line) = event.data {
                stdout.push_str(&line);
                stdout.push('\n');
            }
        }
    }

    let status = handle.wait().await.ok()?;
    status.success().then_some(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_helper_output_without_overwriting_env() {
        let mut meta = CloudMetadata {
            account: Some("from-env".to_string()),
            ..Default::default()
        };
        meta.merge_from_helper_output("account=from-helper\nregion=us-east-1\n");
        assert_eq!(meta.account.as_deref(), Some("from-env"));
        assert_eq!(meta.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn empty_metadata_is_not_present() {
        assert!(!CloudMetadata::default().is_present());
    }
}
