//! Generates the callback module list from the files under `src/callbacks/`.
//!
//! Every `.rs` file whose stem contains `callbacks` becomes a module of
//! `crate::callbacks` and an entry in `DISCOVERED`. Adding a feature is
//! a matter of dropping a new `*_callbacks.rs` file in that tree.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

struct Discovered {
    ident: String,
    name: String,
    path: PathBuf,
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
    let callbacks_dir = manifest_dir.join("src").join("callbacks");
    println!("cargo:rerun-if-changed={}", callbacks_dir.display());

    let mut modules = discover(&callbacks_dir);
    modules.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = String::new();
    for module in &modules {
        writeln!(out, "#[path = {:?}]", module.path.display().to_string()).unwrap();
        writeln!(out, "mod {};", module.ident).unwrap();
    }
    out.push_str("\npub(crate) static DISCOVERED: &[crate::registry::CallbackModule] = &[\n");
    for module in &modules {
        writeln!(
            out,
            "    crate::registry::CallbackModule {{ name: {:?}, register: {}::register }},",
            module.name, module.ident
        )
        .unwrap();
    }
    out.push_str("];\n");

    let dest = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR")).join("callbacks.rs");
    fs::write(&dest, out).expect("write generated callback list");
}

fn discover(root: &Path) -> Vec<Discovered> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.expect("walk src/callbacks");
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if !stem.contains("callbacks") {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .expect("entry lies under the callbacks dir")
            .with_extension("");
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        found.push(Discovered {
            ident: parts.join("_"),
            name: parts.join("::"),
            path: path.to_path_buf(),
        });
    }

    found
}
