//! Shared JSON fixtures for keyframe-core tests and benches.
//!
//! `fixtures/manifest.json` maps fixture names to files, grouped by kind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    skeletons: HashMap<String, Entry>,
    mappings: HashMap<String, Entry>,
    animations: HashMap<String, Entry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        #[allow(dead_code)]
        description: Option<String>,
    },
}

impl Entry {
    fn as_path(&self) -> &str {
        match self {
            Entry::Path(path) => path,
            Entry::Detailed { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Skeleton,
    Mapping,
    Animation,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::Skeleton => "skeleton",
            Kind::Mapping => "mapping",
            Kind::Animation => "animation",
        }
    }

    fn entries(self) -> &'static HashMap<String, Entry> {
        match self {
            Kind::Skeleton => &MANIFEST.skeletons,
            Kind::Mapping => &MANIFEST.mappings,
            Kind::Animation => &MANIFEST.animations,
        }
    }

    fn keys(self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lookup(self, name: &str) -> Result<&'static str> {
        self.entries()
            .get(name)
            .map(Entry::as_path)
            .ok_or_else(|| anyhow!("unknown {} fixture '{name}'", self.label()))
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

macro_rules! fixture_kind {
    ($module:ident, $kind:expr) => {
        pub mod $module {
            use super::*;

            /// Fixture names, sorted.
            pub fn keys() -> Vec<String> {
                $kind.keys()
            }

            pub fn json(name: &str) -> Result<String> {
                read_to_string($kind.lookup(name)?)
            }

            pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
                load_json($kind.lookup(name)?)
            }

            pub fn path(name: &str) -> Result<PathBuf> {
                Ok(resolve_path($kind.lookup(name)?))
            }
        }
    };
}

fixture_kind!(skeletons, Kind::Skeleton);
fixture_kind!(mappings, Kind::Mapping);
fixture_kind!(animations, Kind::Animation);
