pub mod django;
pub mod hybrid;
pub mod supabase;
