mod report;

pub use report::write_response;
