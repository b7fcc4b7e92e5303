// Generated by tonic-build from proto/ into OUT_DIR

pub mod inventory {
    tonic::include_proto!("inventory");
}

pub mod health {
    tonic::include_proto!("grpc.health.v1");
}

/// Encoded descriptors of every service, for gRPC reflection
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("inventory_descriptor");
