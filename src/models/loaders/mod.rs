pub mod seed_loader;

pub use seed_loader::{load_all_seed_files, load_seed_file};
