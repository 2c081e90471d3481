//! Generated protobuf types for the ingestion contract.

tonic::include_proto!("opsbuddy.v1");

const INGESTION_DESCRIPTOR_SET: &[u8] =
    tonic::include_file_descriptor_set!("opsbuddy_v1_ingestion");

pub fn ingestion_file_descriptor_set() -> &'static [u8] {
    INGESTION_DESCRIPTOR_SET
}
