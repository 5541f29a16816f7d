//! Entry point for the on-host orchestration agent: parses the root
//! directory the agent is installed under, then runs INIT once and
//! START/POLL/APPLY/REPORT/SLEEP forever (spec §4.J).

mod status_endpoints;

use anyhow::{Context, Result};
use async_runtime_compat::smol::SmolSpawner;
use async_runtime_compat::Spawner;
use clap::Parser;
use orchestrator_core::{
    fog_address_change, load_orchestration_policy, run_start, run_tick, send_audit_events,
    send_policy_version, AgentConfig, FailureCounter, OrchestrationContext, OrchestrationPolicy,
    TickOutcome, START_RETRY_SLEEP,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "orchestration-agent")]
#[command(about = "On-host orchestration agent")]
struct Args {
    /// Root directory the agent's `conf`/`downloads`/`packages` trees are
    /// rooted at.
    #[arg(short, long, default_value = "/etc/cp/conf")]
    root_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    smol::block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let config = AgentConfig::from_env(&args.root_dir);
    std::fs::create_dir_all(&config.conf_dir).context("creating conf directory")?;

    let policy = acquire_policy(&config).await;
    info!(fog_address = %policy.fog_address, "loaded orchestration policy");

    let context = Arc::new(OrchestrationContext::build(config, &policy).context("assembling orchestration context")?);
    let spawner = SmolSpawner;

    establish_session(&context, &policy, &spawner).await;

    spawn_tenant_gc(Arc::clone(&context), &spawner);

    run_tick_loop(&context, &policy).await;
    Ok(())
}

/// Load the orchestration policy, retrying forever at [`START_RETRY_SLEEP`]
/// if it cannot be read (spec §4.J's START stage never gives up).
async fn acquire_policy(config: &AgentConfig) -> OrchestrationPolicy {
    let policy_file = config.conf_dir.join("policy.json");
    let general_policy_file = config.conf_dir.join("general_settings.json");

    loop {
        match load_orchestration_policy(&policy_file, &general_policy_file) {
            Ok(policy) => return policy,
            Err(e) => {
                warn!(error = %e, "failed to load orchestration policy, retrying");
                async_io::Timer::after(START_RETRY_SLEEP).await;
            }
        }
    }
}

/// Establish the fog session, retrying forever at [`START_RETRY_SLEEP`] on
/// failure.
async fn establish_session(context: &OrchestrationContext, policy: &OrchestrationPolicy, spawner: &SmolSpawner) {
    loop {
        match run_start(context, policy, spawner).await {
            Ok(()) => return,
            Err(e) => {
                error!(error = %e, "failed to establish fog session, retrying");
                async_io::Timer::after(START_RETRY_SLEEP).await;
            }
        }
    }
}

/// Periodically sweep `conf/tenant_*_profile_*` directories for pairs the
/// [`service_controller::TenantManager`] no longer considers active (spec
/// §4.I's "Garbage collection"). Runs on the context's own `Arc` so the task
/// can outlive the stack frame that spawned it.
fn spawn_tenant_gc(context: Arc<OrchestrationContext>, spawner: &SmolSpawner) {
    let interval = service_controller::DEFAULT_GC_INTERVAL;
    spawner.spawn(Box::pin(async move {
        loop {
            async_io::Timer::after(interval).await;
            match service_controller::collect_garbage(&context.tenant_manager, &context.config.conf_dir) {
                Ok(collected) if collected.is_empty() => {}
                Ok(collected) => info!(count = collected.len(), "garbage-collected stale tenant/profile pairs"),
                Err(e) => warn!(error = %e, "tenant garbage collection sweep failed"),
            }
        }
    }));
}

/// The repeating POLL/APPLY/REPORT/SLEEP body. Exits the process on a
/// self-update hand-off or a detected fog-address change, both of which
/// require a fresh process (spec §4.J).
async fn run_tick_loop(context: &OrchestrationContext, policy: &OrchestrationPolicy) {
    let mut failures = FailureCounter::new();
    let policy_file = context.policy_file();
    let general_policy_file = context.general_policy_file();

    loop {
        match run_tick(context, &mut failures).await {
            Ok(TickOutcome::Clean) => {
                let snapshot = context.status.snapshot();
                if let Some(version) = &snapshot.policy_version {
                    if let Some(token) = context.authenticator.access_token() {
                        send_policy_version(&context.http_client, &policy.fog_address, &token, version, &Default::default())
                            .await;
                    }
                }
            }
            Ok(TickOutcome::Degraded(audits)) => {
                for audit in &audits {
                    warn!(title = %audit.title, message = %audit.message, severity = audit.severity, "apply stage degraded");
                }
                if let Some(token) = context.authenticator.access_token() {
                    send_audit_events(
                        &context.http_client,
                        &policy.fog_address,
                        &token,
                        &audits,
                        &context.config.conf_dir.join("pending_audit_events.json"),
                    )
                    .await;
                }
            }
            Ok(TickOutcome::SelfUpdate { service, succeeded }) => {
                info!(service, succeeded, "self-update hand-off, exiting for the new binary to take over");
                return;
            }
            Err(e) => {
                error!(error = %e, "tick failed");
            }
        }

        if let Ok(reloaded) = load_orchestration_policy(&policy_file, &general_policy_file) {
            if fog_address_change(policy, &reloaded) {
                warn!("fog address changed; exiting so the process can restart against the new address");
                return;
            }
        }

        let sleep = if failures.consecutive_failures() == 0 {
            policy.sleep_interval()
        } else {
            failures.next_sleep(policy.error_sleep_interval())
        };
        async_io::Timer::after(sleep).await;
    }
}
