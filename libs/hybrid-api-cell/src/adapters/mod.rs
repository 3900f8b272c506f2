//! Wire shapes of each backend and their mapping into the canonical
//! `shared_models` records.

pub mod django;
pub mod supabase;
