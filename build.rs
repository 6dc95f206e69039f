//! Build script - adds the esp-hal linker script when building the
//! firmware binary.
//!
//! Host builds (`cargo test`) never see the argument, so the library
//! keeps linking as a normal host crate.

use std::env;

fn main() {
    // Cargo sets CARGO_FEATURE_<NAME> for every enabled feature.
    if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tlinkall.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
