use std::{env, io::Result, path::PathBuf};

static INGESTION_DESCRIPTOR_FILE: &str = "opsbuddy_v1_ingestion.bin";

fn main() -> Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    println!("cargo:rerun-if-changed=proto");

    if env::var("PROTOC").is_err() {
        unsafe {
            env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());
        }
    }

    tonic_prost_build::configure()
        .build_client(true)
        .build_server(true)
        .file_descriptor_set_path(out_dir.join(INGESTION_DESCRIPTOR_FILE))
        .compile_protos(&["proto/opsbuddy/ingestion.proto"], &["proto/"])?;

    Ok(())
}
