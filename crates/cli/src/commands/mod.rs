pub mod generate;
pub mod list;

pub use generate::GenerateArgs;
pub use list::ListArgs;
