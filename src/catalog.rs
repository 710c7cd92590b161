//! Remote version catalog: typed schema and the client that fetches it.
//!
//! The wire format is the Zig download index: a JSON object keyed by version
//! name, each entry holding per-platform artifacts plus a few string metadata
//! fields. Rolling entries (`master`) also carry their concrete build id in a
//! `version` field.

use crate::error::{Result, ZvmError};
use crate::http::Transport;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use tracing::debug;

/// A downloadable archive for one version/platform pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactDescriptor {
    #[serde(alias = "tarball")]
    pub url: String,
    #[serde(default)]
    pub shasum: Option<String>,
    /// Upstream publishes the size as a decimal string.
    #[serde(default, deserialize_with = "size_from_str_or_int")]
    pub size: Option<u64>,
}

/// All artifacts published for one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawArtifactSet")]
pub struct ArtifactSet {
    pub version: Option<String>,
    pub date: Option<String>,
    pub artifacts: BTreeMap<String, ArtifactDescriptor>,
}

#[derive(Deserialize)]
struct RawArtifactSet {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<RawArtifactSet> for ArtifactSet {
    type Error = String;

    fn try_from(raw: RawArtifactSet) -> std::result::Result<Self, Self::Error> {
        let mut artifacts = BTreeMap::new();
        for (key, value) in raw.rest {
            match value {
                // docs, notes, stdDocs and friends
                serde_json::Value::String(_) => {}
                serde_json::Value::Object(_) => {
                    let descriptor: ArtifactDescriptor = serde_json::from_value(value)
                        .map_err(|e| format!("artifact {key:?}: {e}"))?;
                    artifacts.insert(key, descriptor);
                }
                other => return Err(format!("unexpected value for {key:?}: {other}")),
            }
        }
        Ok(ArtifactSet {
            version: raw.version,
            date: raw.date,
            artifacts,
        })
    }
}

impl ArtifactSet {
    pub fn artifact(&self, platform_key: &str) -> Option<&ArtifactDescriptor> {
        self.artifacts.get(platform_key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, ArtifactSet>,
}

impl Catalog {
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        let catalog: Catalog = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if let Some((name, _)) = catalog.entries.iter().find(|(_, set)| set.artifacts.is_empty()) {
            return Err(format!("entry {name:?} lists no artifacts"));
        }
        Ok(catalog)
    }

    pub fn get(&self, version: &str) -> Option<&ArtifactSet> {
        self.entries.get(version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Version names with `master` first, then releases newest first. Names
    /// that are not semver go last, alphabetically.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut rolling = Vec::new();
        let mut releases = Vec::new();
        let mut other = Vec::new();
        for name in self.entries.keys() {
            if name == crate::resolver::MASTER {
                rolling.push(name.clone());
            } else if let Ok(v) = semver::Version::parse(name) {
                releases.push((v, name.clone()));
            } else {
                other.push(name.clone());
            }
        }
        releases.sort_by(|a, b| b.0.cmp(&a.0));
        rolling
            .into_iter()
            .chain(releases.into_iter().map(|(_, name)| name))
            .chain(other)
            .collect()
    }
}

fn size_from_str_or_int<'de, D>(d: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Int(u64),
        Text(String),
    }
    match Option::<Size>::deserialize(d)? {
        None => Ok(None),
        Some(Size::Int(n)) => Ok(Some(n)),
        Some(Size::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub struct CatalogClient<'a> {
    transport: &'a dyn Transport,
}

impl<'a> CatalogClient<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Fetch and decode the catalog at `url`. Always goes to the network.
    pub fn fetch(&self, url: &str) -> Result<Catalog> {
        let unavailable = |reason: String| ZvmError::CatalogUnavailable {
            url: url.to_string(),
            reason,
        };
        let mut body = Vec::new();
        self.transport.get(url, &mut body).map_err(unavailable)?;
        let catalog = Catalog::parse(&body).map_err(unavailable)?;
        debug!(url, versions = catalog.len(), "fetched version catalog");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INDEX: &str = r#"{
      "master": {
        "version": "0.12.0-dev.2063+804cee3b9",
        "date": "2024-01-07",
        "docs": "https://ziglang.org/documentation/master/",
        "src": {"tarball": "https://ziglang.org/builds/zig-0.12.0-dev.2063+804cee3b9.tar.xz", "shasum": "aa", "size": "16137660"},
        "x86_64-linux": {"tarball": "https://ziglang.org/builds/zig-linux-x86_64-0.12.0-dev.2063+804cee3b9.tar.xz", "shasum": "bb", "size": "44571304"}
      },
      "0.11.0": {
        "date": "2023-08-04",
        "notes": "https://ziglang.org/download/0.11.0/release-notes.html",
        "x86_64-linux": {"tarball": "https://ziglang.org/download/0.11.0/zig-linux-x86_64-0.11.0.tar.xz", "shasum": "cc", "size": 44961892},
        "aarch64-macos": {"tarball": "https://ziglang.org/download/0.11.0/zig-macos-aarch64-0.11.0.tar.xz", "shasum": "dd", "size": "40343564"}
      },
      "0.9.1": {"x86_64-linux": {"url": "https://example.invalid/zig-0.9.1.tar.xz"}}
    }"#;

    #[test]
    fn parses_upstream_index_shape() {
        let catalog = Catalog::parse(INDEX.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 3);
        let master = catalog.get("master").unwrap();
        assert_eq!(master.version.as_deref(), Some("0.12.0-dev.2063+804cee3b9"));
        assert_eq!(master.artifact("x86_64-linux").unwrap().size, Some(44571304));

        let release = catalog.get("0.11.0").unwrap();
        assert_eq!(release.version, None);
        assert_eq!(release.artifacts.len(), 2);
        assert_eq!(
            release.artifact("x86_64-linux").unwrap(),
            &ArtifactDescriptor {
                url: "https://ziglang.org/download/0.11.0/zig-linux-x86_64-0.11.0.tar.xz".into(),
                shasum: Some("cc".into()),
                size: Some(44961892),
            }
        );

        let old = catalog.get("0.9.1").unwrap().artifact("x86_64-linux").unwrap();
        assert_eq!(old.shasum, None);
        assert_eq!(old.size, None);
    }

    #[test]
    fn rejects_unknown_shapes() {
        let numeric_field = r#"{"0.11.0": {"x86_64-linux": {"tarball": "u"}, "weird": 7}}"#;
        assert!(Catalog::parse(numeric_field.as_bytes()).is_err());

        let not_a_descriptor = r#"{"0.11.0": {"x86_64-linux": {"shasum": "no url"}}}"#;
        assert!(Catalog::parse(not_a_descriptor.as_bytes()).is_err());

        let bad_size = r#"{"0.11.0": {"x86_64-linux": {"tarball": "u", "size": "big"}}}"#;
        assert!(Catalog::parse(bad_size.as_bytes()).is_err());

        assert!(Catalog::parse(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn rejects_entries_without_artifacts() {
        let err = Catalog::parse(br#"{"0.11.0": {"date": "2023-08-04"}}"#).unwrap_err();
        assert!(err.contains("0.11.0"), "{err}");
    }

    #[test]
    fn sorted_names_puts_master_first_then_newest() {
        let json = r#"{
          "0.9.1": {"a": {"tarball": "u"}},
          "mach-latest": {"a": {"tarball": "u"}},
          "0.11.0": {"a": {"tarball": "u"}},
          "master": {"version": "0.12.0-dev.1", "a": {"tarball": "u"}},
          "0.10.1": {"a": {"tarball": "u"}}
        }"#;
        let catalog = Catalog::parse(json.as_bytes()).unwrap();
        assert_eq!(
            catalog.sorted_names(),
            vec!["master", "0.11.0", "0.10.1", "0.9.1", "mach-latest"]
        );
    }
}
