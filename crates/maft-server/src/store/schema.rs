// crates/maft-server/src/store/schema.rs

//! Table definitions for the metadata store.

diesel::table! {
    file_metadata (index) {
        index -> BigInt,
        hash -> Bytea,
        merkle_proof -> Array<Bytea>,
    }
}
