//! Expansion of dotted keys.
//!
//! Secret stores are flat: a secret holding `{"oidc.clientSecret": "x"}` is
//! the only way to target a nested setting. Expanding the keys turns it into
//! `{"oidc": {"clientSecret": "x"}}` before it is merged.

use indexmap::IndexMap;

use super::{ProviderError, ProviderResult};
use crate::value::ConfigValue;

/// Expand every dotted top-level key of `flat` into nested maps.
///
/// Keys without dots are kept as they are. A key with an empty segment
/// (`a..b`, `.a`) is kept literally. Two keys that need the same location to
/// be both a map and a value are a [`ProviderError::NestConflict`].
pub fn nest_dotted_keys(flat: IndexMap<String, ConfigValue>) -> ProviderResult<ConfigValue> {
    let mut nested: IndexMap<String, ConfigValue> = IndexMap::new();
    for (key, value) in flat {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            insert_leaf(&mut nested, &key, &key, value)?;
            continue;
        }
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };

        let mut node = &mut nested;
        for (depth, parent) in parents.iter().enumerate() {
            let slot = node
                .entry(parent.to_string())
                .or_insert_with(ConfigValue::empty_map);
            node = slot.as_map_mut().ok_or_else(|| ProviderError::NestConflict {
                key: key.clone(),
                at: segments[..=depth].join("."),
            })?;
        }
        insert_leaf(node, &key, leaf, value)?;
    }
    Ok(ConfigValue::Map(nested))
}

fn insert_leaf(
    node: &mut IndexMap<String, ConfigValue>,
    full_key: &str,
    leaf: &str,
    value: ConfigValue,
) -> ProviderResult<()> {
    match (node.get_mut(leaf), value) {
        (None, value) => {
            node.insert(leaf.to_string(), value);
            Ok(())
        }
        (Some(ConfigValue::Map(existing)), ConfigValue::Map(incoming)) => {
            for (k, v) in incoming {
                if existing.contains_key(&k) {
                    return Err(ProviderError::NestConflict {
                        key: full_key.to_string(),
                        at: format!("{}.{}", full_key, k),
                    });
                }
                existing.insert(k, v);
            }
            Ok(())
        }
        (Some(_), _) => Err(ProviderError::NestConflict {
            key: full_key.to_string(),
            at: full_key.to_string(),
        }),
    }
}
