//! AWS implementation of the tfvarenv object store
//!
//! Objects live in S3 with bucket versioning enabled; the caller identity
//! comes from STS. Credentials follow the SDK default provider chain.

mod s3;

pub use s3::AwsStore;
