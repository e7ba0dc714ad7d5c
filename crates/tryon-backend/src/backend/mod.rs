//! Collaborator implementations.

mod memory;
mod supabase;

pub use memory::MemoryBackend;
pub use supabase::{SupabaseBackend, ACCOUNTS_TABLE};
