mod representation;

pub use representation::Representation;
