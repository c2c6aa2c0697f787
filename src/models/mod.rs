pub mod account;
pub mod enums;
pub mod filters;
pub mod medical_record;
pub mod patient;
pub mod screening;

pub use account::*;
pub use filters::*;
pub use medical_record::*;
pub use patient::*;
pub use screening::*;
