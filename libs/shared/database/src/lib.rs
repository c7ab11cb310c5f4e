pub mod catalog;
pub mod supabase;

pub use catalog::CatalogRepository;
pub use supabase::{SupabaseClient, SupabaseError};
