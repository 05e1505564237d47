mod abstraction_layer;
mod nfs_layer;
#[cfg(feature = "s3")]
mod s3_layer;

pub use self::abstraction_layer::AbstractionLayer;
pub use self::nfs_layer::NFSAbstractionLayer;
#[cfg(feature = "s3")]
pub use self::s3_layer::AmazonS3AbstractionLayer;
