fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Ordered maps keep encoded configs byte-stable for identical input.
    let mut config = prost_build::Config::new();
    config.btree_map(["."]);
    // Serializable so the CLI can print runtime status as JSON.
    config.type_attribute(".", "#[derive(serde::Serialize)]");

    // Client-only stubs for the CRI v1 RuntimeService and ImageService.
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_with_config(config, &["proto/api.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/api.proto");

    Ok(())
}
