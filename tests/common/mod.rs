//! Shared fixtures for integration tests: an in-memory transport and
//! archives that look like upstream Zig tarballs.

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use xz2::write::XzEncoder;
use zvm::config::Settings;
use zvm::http::Transport;
use zvm::platform::zig_binary_name;
use zvm::Zvm;

pub const CATALOG_URL: &str = "https://zig.test/download/index.json";
pub const ZLS_URL: &str = "https://zls.test/";
pub const PLATFORM: &str = "x86_64-linux";

#[derive(Default)]
struct Inner {
    files: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

/// Serves registered URLs from memory and records every request.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    pub fn serve(&self, url: &str, body: Vec<u8>) {
        self.inner.files.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.inner.requests.lock().unwrap().clear();
    }
}

impl Transport for MemoryTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, String> {
        self.inner.requests.lock().unwrap().push(url.to_string());
        let files = self.inner.files.lock().unwrap();
        let Some(body) = files.get(url) else {
            return Err("HTTP 404 Not Found".to_string());
        };
        sink.write_all(body).map_err(|e| e.to_string())?;
        Ok(body.len() as u64)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A `zig` stand-in: prints `build` for `zig version`, exits 7 otherwise.
pub fn zig_script(build: &str) -> String {
    format!("#!/bin/sh\nif [ \"$1\" = \"version\" ]; then echo \"{build}\"; exit 0; fi\nexit 7\n")
}

fn append(builder: &mut tar::Builder<XzEncoder<Vec<u8>>>, path: &str, data: &[u8], mode: u32) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append_data(&mut header, path, data).unwrap();
}

/// `<top>/zig` plus a bit of standard library, xz-compressed.
pub fn zig_tar_xz(top: &str, build: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(XzEncoder::new(Vec::new(), 6));
    append(
        &mut builder,
        &format!("{top}/{}", zig_binary_name()),
        zig_script(build).as_bytes(),
        0o755,
    );
    append(
        &mut builder,
        &format!("{top}/lib/std/std.zig"),
        b"pub const io = @import(\"io.zig\");\n",
        0o644,
    );
    builder.into_inner().unwrap().finish().unwrap()
}

/// A single top-level file archive, as ZLS ships.
pub fn single_binary_tar_xz(name: &str, data: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(XzEncoder::new(Vec::new(), 6));
    append(&mut builder, name, data, 0o755);
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn zig_zip(top: &str, build: &str) -> Vec<u8> {
    use zip::write::FileOptions;
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let exec = FileOptions::default().unix_permissions(0o755);
    writer.add_directory(format!("{top}/"), FileOptions::default()).unwrap();
    writer
        .start_file(format!("{top}/{}", zig_binary_name()), exec)
        .unwrap();
    writer.write_all(zig_script(build).as_bytes()).unwrap();
    writer
        .start_file(format!("{top}/lib/std/std.zig"), FileOptions::default())
        .unwrap();
    writer.write_all(b"pub const io = 1;\n").unwrap();
    writer.finish().unwrap().into_inner()
}

/// Every file under `dir` with its content.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if entry.file_type().unwrap().is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap().to_path_buf();
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}

/// A temp install root, a transport and a catalog that tests add to.
pub struct Fixture {
    pub tmp: TempDir,
    pub transport: MemoryTransport,
    pub zvm: Zvm,
    catalog: RefCell<Map<String, Value>>,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::default();
        let zvm = Self::build_zvm(tmp.path(), &transport);
        let fixture = Self {
            tmp,
            transport,
            zvm,
            catalog: RefCell::new(Map::new()),
        };
        fixture.republish();
        fixture
    }

    fn build_zvm(base: &Path, transport: &MemoryTransport) -> Zvm {
        let settings = Settings {
            version_map_url: CATALOG_URL.to_string(),
            zls_version_map_url: ZLS_URL.to_string(),
            ..Settings::default()
        };
        Zvm::new(settings, base.join("zvm"), Box::new(transport.clone())).with_platform_key(PLATFORM)
    }

    /// A second engine over the same root, as another process would be.
    pub fn another_zvm(&self) -> Zvm {
        Self::build_zvm(self.tmp.path(), &self.transport)
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("zvm")
    }

    pub fn tarball_url(build: &str) -> String {
        format!("https://zig.test/builds/zig-{PLATFORM}-{build}.tar.xz")
    }

    pub fn add_release(&self, version: &str) {
        self.add_entry(version, version, false);
    }

    pub fn add_master(&self, build: &str) {
        self.add_entry("master", build, true);
    }

    fn add_entry(&self, key: &str, build: &str, rolling: bool) {
        let url = Self::tarball_url(build);
        let bytes = zig_tar_xz(&format!("zig-{PLATFORM}-{build}"), build);
        let descriptor = json!({
            "tarball": url,
            "shasum": sha256_hex(&bytes),
            "size": bytes.len().to_string(),
        });
        self.transport.serve(&url, bytes);
        self.add_raw_entry(key, build, rolling, descriptor);
    }

    /// Register an entry whose descriptor the test controls.
    pub fn add_raw_entry(&self, key: &str, build: &str, rolling: bool, descriptor: Value) {
        let mut entry = json!({ "date": "2024-01-07", "docs": "https://ziglang.org/documentation/" });
        if rolling {
            entry["version"] = json!(build);
        }
        entry[PLATFORM] = descriptor;
        self.catalog.borrow_mut().insert(key.to_string(), entry);
        self.republish();
    }

    fn republish(&self) {
        let body = serde_json::to_vec(&Value::Object(self.catalog.borrow().clone())).unwrap();
        self.transport.serve(CATALOG_URL, body);
    }

    /// Directories left in the staging area (lock files do not count).
    pub fn staging_trees(&self) -> Vec<PathBuf> {
        let staging = self.root().join(".staging");
        if !staging.exists() {
            return Vec::new();
        }
        std::fs::read_dir(staging)
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().unwrap().is_dir())
            .map(|e| e.path())
            .collect()
    }
}
