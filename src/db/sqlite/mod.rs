mod history;
mod instances;

pub use history::SqliteHistoryRepo;
pub use instances::SqliteInstanceRepo;
