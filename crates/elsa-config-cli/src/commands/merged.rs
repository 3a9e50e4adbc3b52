//! `elsa-config merged`: the merged and overlaid tree before validation.
//!
//! Nothing has been validated yet, so secrets are found by key name.

use anyhow::Result;
use elsa_config::{EnvSnapshot, ResolveError, redact_by_keywords};

use super::{CommonArgs, fail, runtime};

pub fn execute(args: CommonArgs) -> Result<()> {
    let resolver = args.resolver(EnvSnapshot::from_process());
    let meta = args
        .meta(&resolver)
        .map_err(|e| fail(args.format, None, e))?;

    match runtime()?.block_on(resolver.resolve_merged(&meta)) {
        Ok(merged) => {
            let redacted = redact_by_keywords(&merged).to_json();
            println!("{}", serde_json::to_string_pretty(&redacted)?);
            Ok(())
        }
        Err(error @ ResolveError::Meta(_)) => Err(fail(args.format, Some(&meta), error)),
        Err(error) => Err(fail(args.format, None, error)),
    }
}
