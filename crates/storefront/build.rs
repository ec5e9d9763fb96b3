//! Build script for storefront crate.
//!
//! Computes content hashes for the stylesheet and script so templates can
//! reference them with a cache-busting query string.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Static assets hashed at build time, with the env var each hash lands in.
const ASSETS: &[(&str, &str)] = &[
    ("static/css/main.css", "CSS_HASH"),
    ("static/js/app.js", "JS_HASH"),
];

fn main() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR not set; asset hashes disabled");
        for (_, var) in ASSETS {
            println!("cargo:rustc-env={var}=dev");
        }
        return;
    };

    for (relative, var) in ASSETS {
        let path = Path::new(&manifest_dir).join(relative);
        println!("cargo:rerun-if-changed={}", path.display());
        println!("cargo:rustc-env={var}={}", short_hash(&path));
    }
}

/// First 8 hex chars of the file's SHA-256, or `dev` when it can't be read.
fn short_hash(path: &Path) -> String {
    match fs::read(path) {
        Ok(content) => {
            let digest = format!("{:x}", Sha256::digest(&content));
            digest.chars().take(8).collect()
        }
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", path.display());
            "dev".to_string()
        }
    }
}
