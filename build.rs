use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Embed the manifest (DPI awareness) only when targeting Windows
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        let _ = embed_resource::compile("captcha-solver.rc", embed_resource::NONE);
        println!("cargo:rerun-if-changed=captcha-solver.rc");
        println!("cargo:rerun-if-changed=captcha-solver.manifest");
    }

    copy_config();
}

/// Copies config.json next to the built executable.
fn copy_config() {
    let Ok(out_dir) = env::var("OUT_DIR") else {
        return;
    };
    // OUT_DIR is target/<profile>/build/<pkg>-<hash>/out
    let Some(target_dir) = Path::new(&out_dir).ancestors().nth(3) else {
        return;
    };

    let config_src = Path::new("config.json");
    if config_src.exists() {
        let _ = fs::copy(config_src, target_dir.join("config.json"));
        println!("cargo:rerun-if-changed=config.json");
    }
}
