mod cell;
mod fact;
mod raw;
mod table_row;
mod watermark;

pub use cell::{Cell, CellKey};
pub use fact::FactRecord;
pub use raw::{RawEntity, RawTable};
pub use table_row::TableRow;
pub use watermark::{StoredWatermark, TimeWatermark};

pub use postgres::schema::WarehouseTable;
