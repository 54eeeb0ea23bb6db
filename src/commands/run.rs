//! `npmx run` - classify, fetch, and execute a package through the tiered
//! orchestrator's `npx`-style pathway.

use std::rc::Rc;

use anyhow::Result;

use crate::config::Config;
use crate::orchestrator::{parse_invocation, ExecuteOptions, Orchestrator, ReqwestCdnTransport, UnavailableSandbox};
use crate::registry::{RegistryFacade, ReqwestTransport};

pub async fn run(command: String, args: Vec<String>, config: &Config) -> Result<()> {
    let invocation = parse_invocation(&command, &args);

    let transport = Rc::new(ReqwestTransport::new());
    let registry = RegistryFacade::new(transport, &config.registry, &config.cache);
    let cdn = Rc::new(ReqwestCdnTransport::new());
    let sandbox = Rc::new(UnavailableSandbox);

    let orchestrator = Orchestrator::new(
        &registry,
        cdn,
        sandbox,
        config.registry.clone(),
        config.orchestrator.clone(),
    );

    let result = orchestrator.execute(&invocation, &ExecuteOptions::default()).await;

    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }

    if result.exit_code != 0 {
        std::process::exit(result.exit_code);
    }
    Ok(())
}
