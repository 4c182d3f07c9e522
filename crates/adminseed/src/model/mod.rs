mod id;
mod level;
mod unit;

pub use id::UnitId;
pub use level::Level;
pub use unit::{
    AdminUnit, City, Country, County, District, Municipality, Parish, RowMeta, SubCounty, Village,
};
