//! Puts `memory.x` on the linker search path for the firmware binary.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
	let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
	File::create(out.join("memory.x"))
		.unwrap()
		.write_all(include_bytes!("memory.x"))
		.unwrap();
	println!("cargo:rustc-link-search={}", out.display());
	println!("cargo:rerun-if-changed=memory.x");
	println!("cargo:rerun-if-changed=build.rs");

	let target = env::var("TARGET").unwrap_or_default();
	if target.starts_with("thumb") {
		println!("cargo:rustc-link-arg-bins=--nmagic");
		println!("cargo:rustc-link-arg-bins=-Tlink.x");
	}
}
