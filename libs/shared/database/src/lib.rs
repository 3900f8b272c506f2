pub mod django;
pub mod session_store;
pub mod supabase;
