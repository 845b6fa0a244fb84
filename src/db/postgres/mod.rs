mod history;
mod instances;

pub use history::PostgresHistoryRepo;
pub use instances::PostgresInstanceRepo;
