//! Upstream schema: fetch-once cache, SDL repair, type index and
//! exploration views.

pub mod cache;
pub mod explore;
pub mod index;
pub mod repair;

pub use cache::{DEFAULT_FETCH_TIMEOUT, SchemaCache, SchemaState, SchemaText};
pub use explore::ExploreError;
pub use index::{
    DEFAULT_DEPRECATION_REASON, EnumValueDefinition, FieldDefinition, InputValueDefinition,
    SchemaIndex, SchemaParseError, TypeDefinition, TypeKind, TypeRef,
};
pub use repair::{BUILTIN_SCALARS, remove_builtin_scalars};
