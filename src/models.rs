pub mod leads;
pub mod prizes;
pub mod referrers;
pub mod reports;
