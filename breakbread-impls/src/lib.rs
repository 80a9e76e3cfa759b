mod locations;
mod places;
mod sessions;
mod supabase;

pub use locations::*;
pub use places::*;
pub use sessions::*;
pub use supabase::*;
