mod history;
mod instances;

pub use history::*;
pub use instances::*;
