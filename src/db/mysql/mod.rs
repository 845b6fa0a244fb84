mod history;
mod instances;

pub use history::MysqlHistoryRepo;
pub use instances::MysqlInstanceRepo;
