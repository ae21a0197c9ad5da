mod column_type;
mod models;

pub use column_type::ColumnType;
pub use models::*;
