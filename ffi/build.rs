use std::env;
use std::path::PathBuf;

/// Generate `rest_ffi.h` into `OUT_DIR` from the `extern "C"` surface.
fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("REST_FFI_H")
        .with_documentation(true)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("rest_ffi.h"));
        }
        Err(e) => println!("cargo:warning=rest_ffi.h not generated: {e}"),
    }
}
