//! `elsa-config sources`: the parsed meta string, one source per line.

use anyhow::Result;
use elsa_config::EnvSnapshot;
use elsa_config::meta::ProviderInvocation;

use super::{CommonArgs, fail};
use crate::OutputFormat;

pub fn execute(args: CommonArgs) -> Result<()> {
    let resolver = args.resolver(EnvSnapshot::from_process());
    let meta = args
        .meta(&resolver)
        .map_err(|e| fail(args.format, None, e))?;
    let sources = resolver
        .sources(&meta)
        .map_err(|e| fail(args.format, Some(&meta), e))?;
    println!("{}", render_sources(args.format, &sources));
    Ok(())
}

fn render_sources(format: OutputFormat, sources: &[ProviderInvocation]) -> String {
    match format {
        OutputFormat::Text => sources
            .iter()
            .enumerate()
            .map(|(i, source)| format!("{}. {}", i + 1, source))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let list: Vec<_> = sources
                .iter()
                .map(|source| {
                    serde_json::json!({
                        "provider": source.name(),
                        "arguments": source
                            .arguments
                            .iter()
                            .map(|a| a.value.clone())
                            .collect::<Vec<_>>(),
                        "line": source.provider.position.line,
                        "column": source.provider.position.column,
                    })
                })
                .collect();
            serde_json::Value::Array(list).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elsa_config::meta::parse_meta;

    #[test]
    fn test_render_sources_text() {
        let sources = parse_meta("file('base') aws-secret('ElsaDev')").unwrap();
        assert_eq!(
            render_sources(OutputFormat::Text, &sources),
            "1. file('base')\n2. aws-secret('ElsaDev')"
        );
    }

    #[test]
    fn test_render_sources_json() {
        let sources = parse_meta("file('a', 2)").unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render_sources(OutputFormat::Json, &sources)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"provider": "file", "arguments": ["a", "2"], "line": 1, "column": 1}])
        );
    }
}
