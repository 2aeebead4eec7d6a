//! SurrealDB schema definitions for the metadata store (spec.md §4.2).
//!
//! Tables mirror the relational shape the spec describes: `versions`,
//! `tags`, `branches`, `search_index`, `storage_metadata`. The
//! `current_branch` marker is deliberately NOT a table here — per spec.md
//! §6 it is a plain sibling file (`<repo>/.chronolog/current_branch`),
//! handled by [`crate::current_branch`].

pub const SCHEMA: &str = r#"
DEFINE TABLE versions SCHEMAFULL;
DEFINE FIELD file_path ON versions TYPE string;
DEFINE FIELD blob_digest ON versions TYPE string;
DEFINE FIELD timestamp ON versions TYPE datetime;
DEFINE FIELD parent_digest ON versions TYPE option<string>;
DEFINE FIELD annotation ON versions TYPE option<string>;
DEFINE FIELD byte_size ON versions TYPE int;
DEFINE INDEX idx_versions_path_digest ON versions FIELDS file_path, blob_digest UNIQUE;
DEFINE INDEX idx_versions_path ON versions FIELDS file_path;
DEFINE INDEX idx_versions_timestamp ON versions FIELDS timestamp;

DEFINE TABLE tags SCHEMAFULL;
DEFINE FIELD name ON tags TYPE string;
DEFINE FIELD blob_digest ON tags TYPE string;
DEFINE FIELD timestamp ON tags TYPE datetime;
DEFINE FIELD description ON tags TYPE option<string>;
DEFINE INDEX idx_tags_name ON tags FIELDS name UNIQUE;

DEFINE TABLE branches SCHEMAFULL;
DEFINE FIELD name ON branches TYPE string;
DEFINE FIELD head_digest ON branches TYPE string;
DEFINE FIELD created_at ON branches TYPE datetime;
DEFINE FIELD parent_branch ON branches TYPE option<string>;
DEFINE INDEX idx_branches_name ON branches FIELDS name UNIQUE;

DEFINE TABLE search_index SCHEMAFULL;
DEFINE FIELD blob_digest ON search_index TYPE string;
DEFINE FIELD file_path ON search_index TYPE string;
DEFINE FIELD content_text ON search_index TYPE string;
DEFINE INDEX idx_search_digest_path ON search_index FIELDS blob_digest, file_path UNIQUE;
DEFINE INDEX idx_search_path ON search_index FIELDS file_path;

DEFINE TABLE storage_metadata SCHEMAFULL;
DEFINE FIELD digest ON storage_metadata TYPE string;
DEFINE FIELD size ON storage_metadata TYPE int;
DEFINE FIELD compression_ratio ON storage_metadata TYPE option<float>;
DEFINE FIELD access_count ON storage_metadata TYPE int;
DEFINE FIELD last_accessed ON storage_metadata TYPE datetime;
DEFINE FIELD is_orphaned ON storage_metadata TYPE bool;
DEFINE INDEX idx_storage_digest ON storage_metadata FIELDS digest UNIQUE;
"#;

/// The `main` branch always exists from init (spec.md §3).
pub const MAIN_BRANCH: &str = "main";
