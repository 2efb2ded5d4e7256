use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/ffi.rs");

    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let package_name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "brick".to_string());

    // Output to include/brick.h (where the mobile build picks it up)
    let output_file = PathBuf::from(&crate_dir)
        .join("include")
        .join(format!("{}.h", package_name));

    let generated = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("BRICK_H")
        .with_documentation(true)
        .generate();

    match generated {
        Ok(bindings) => {
            if let Some(parent) = output_file.parent()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                println!("cargo:warning=cannot create {}: {}", parent.display(), e);
                return;
            }
            bindings.write_to_file(&output_file);
            println!("cargo:warning=Generated C header: {}", output_file.display());
        }
        // header generation is best-effort
        Err(e) => println!("cargo:warning=cbindgen generation skipped: {}", e),
    }
}
