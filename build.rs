fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_dir = std::path::Path::new("proto");

    let protos = [
        proto_dir.join("google/type/latlng.proto"),
        proto_dir.join("google/firestore/v1/common.proto"),
        proto_dir.join("google/firestore/v1/document.proto"),
        proto_dir.join("google/firestore/v1/query.proto"),
        proto_dir.join("google/firestore/v1/write.proto"),
        proto_dir.join("google/firestore/v1/aggregation_result.proto"),
        proto_dir.join("google/firestore/v1/firestore.proto"),
    ];

    for proto in &protos {
        println!("cargo:rerun-if-changed={}", proto.display());
    }

    // Integration tests drive the emulator with a generated tonic client, so
    // the client stubs are always built alongside the server.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&protos, &[proto_dir])?;

    Ok(())
}
