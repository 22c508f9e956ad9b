//! Row types with their query methods.

pub mod field_mapping;
pub mod mapping_validation;
pub mod mirrored_record;
pub mod source_connection;

pub use field_mapping::{CanonicalField, FieldMap, FieldMapping};
pub use mapping_validation::MappingValidation;
pub use mirrored_record::MirroredRecord;
pub use source_connection::{CreateSourceConnection, SourceConnection, SourceKind};
