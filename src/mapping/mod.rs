//! Mapping configuration: raw config structs, the compiled model and the
//! compiler that connects them.

pub mod compiler;
pub mod config;
pub mod model;

pub use compiler::{compile, compile_config};
pub use config::IndexerConfig;
pub use model::{
    Follow, IndexField, IndexFieldBinding, IndexFieldType, LinkFieldFollow, MappingModel,
    MasterFollow, RecordTypeMapping, Scope, ValueSource,
};
