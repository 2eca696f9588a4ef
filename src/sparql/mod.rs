//! The SPARQL construction engine, per spec §4.1/§4.2/§4.9: the
//! sanitizer (the only place user text becomes query syntax), the DSL →
//! SPARQL builder, opaque pagination cursors, and result/graph
//! formatting.

pub mod builder;
pub mod cursor;
pub mod formatter;
pub mod result_mapper;
pub mod sanitizer;

pub use builder::{build_construct, build_select, build_select_with_cursor};
pub use cursor::{decode_cursor, encode_cursor, CursorValue, CursorValueType};
pub use formatter::{FormatError, GraphFormat, GraphFormatter, JsonLdSerializer};
pub use result_mapper::ResultMapper;
pub use sanitizer::{escape_iri, escape_literal, format_term, validate_prefix, SparqlFragment};
