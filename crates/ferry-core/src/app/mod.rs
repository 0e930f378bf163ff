//! App - パイプラインの組み立て
//!
//! - **driver**: ArtifactDriver（Load / Save）

pub mod driver;

pub use self::driver::ArtifactDriver;
