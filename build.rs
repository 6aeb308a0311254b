fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fall back to the vendored protoc when none is provided
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        // `rpc Connect` would clash with the generated `RouteClient::connect` constructor
        .build_transport(false)
        .compile_protos(&["proto/route.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/route.proto");
    Ok(())
}
