//! `elsa-config resolve`: the validated configuration, secrets redacted.

use anyhow::Result;
use elsa_config::{EnvSnapshot, ResolveError};
use tracing::info;

use super::{CommonArgs, fail, runtime};

pub fn execute(args: CommonArgs) -> Result<()> {
    let resolver = args.resolver(EnvSnapshot::from_process());
    let meta = args
        .meta(&resolver)
        .map_err(|e| fail(args.format, None, e))?;

    let resolved = runtime()?.block_on(resolver.resolve(&meta));
    match resolved {
        Ok(config) => {
            info!(
                sensitive = config.sensitive_paths.len(),
                "configuration resolved"
            );
            println!("{}", serde_json::to_string_pretty(&config.redacted_json())?);
            Ok(())
        }
        Err(error @ ResolveError::Meta(_)) => Err(fail(args.format, Some(&meta), error)),
        Err(error) => Err(fail(args.format, None, error)),
    }
}
