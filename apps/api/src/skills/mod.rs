// Skill canonicalization: org synonyms, global taxonomy, fuzzy fallback.
// Readers work off an immutable snapshot; admin writes swap in a new one.

pub mod admin;
pub mod canonicalizer;
pub mod handlers;
pub mod normalize;
pub mod snapshot;
pub mod store;
